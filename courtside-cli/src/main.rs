mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use courtside_core::Side;
use courtside_session::{
    logger, Command as Operation, Config, ContactDirectory, Credentials, FsStore, Outcome,
    Session, StaticProvider,
};

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// Path to the config file.
    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,
    #[clap(short, long)]
    email: Option<String>,
    #[clap(short, long)]
    password: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the current bracket.
    Show,
    /// Print the contact directory.
    Contacts,
    /// Record (or unselect) the winner of a match.
    SelectWinner {
        round: usize,
        slot: usize,
        candidate: String,
    },
    /// Overwrite the score on one side of a match.
    EditScore {
        round: usize,
        slot: usize,
        side: SideArg,
        value: String,
    },
    /// Overwrite the scheduled time of a match.
    EditTime {
        round: usize,
        slot: usize,
        value: String,
    },
    /// Overwrite a player name. The spot keeps the name from then on.
    EditName {
        round: usize,
        slot: usize,
        side: SideArg,
        name: String,
    },
    /// Clear the whole bracket back to the seeded state.
    Reset,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SideArg {
    Player1,
    Player2,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Player1 => Side::Player1,
            SideArg::Player2 => Side::Player2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::from_file(&args.config).await {
        Ok(config) => config.with_environment(),
        Err(err) => {
            eprintln!("Failed to read {}: {}", args.config.display(), err);
            return ExitCode::FAILURE;
        }
    };

    logger::init(config.loglevel);

    let store = FsStore::new(&config.store.root);

    let provider = match StaticProvider::from_file(&config.store.users).await {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("Failed to read {}: {}", config.store.users.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let session = match Session::open(
        store,
        provider,
        config.tournament.key.clone(),
        config.tournament.sport.clone(),
        config.tournament.entrants.clone(),
    )
    .await
    {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Failed to open bracket {}: {}", config.tournament.key, err);
            return ExitCode::FAILURE;
        }
    };

    if let Some((email, password)) = args.email.zip(args.password) {
        match session.sign_in(&Credentials { email, password }).await {
            Ok(role) => println!("Signed in ({role})"),
            Err(err) => {
                eprintln!("Failed to sign in: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    let operation = match args.command {
        Command::Show => {
            render::print_bracket(&session.snapshot());
            return ExitCode::SUCCESS;
        }
        Command::Contacts => {
            let contacts = session.load_contacts(&ContactDirectory::new()).await;
            render::print_contacts(&contacts);
            return ExitCode::SUCCESS;
        }
        Command::SelectWinner {
            round,
            slot,
            candidate,
        } => Operation::SelectWinner {
            round,
            slot,
            candidate,
        },
        Command::EditScore {
            round,
            slot,
            side,
            value,
        } => Operation::EditScore {
            round,
            slot,
            side: side.into(),
            value,
        },
        Command::EditTime { round, slot, value } => Operation::EditTime { round, slot, value },
        Command::EditName {
            round,
            slot,
            side,
            name,
        } => Operation::EditName {
            round,
            slot,
            side: side.into(),
            name,
        },
        Command::Reset => Operation::Reset,
    };

    match session.apply(operation) {
        Outcome::Applied => {
            // The session already dispatched a background save; await one
            // explicitly so a one-shot process doesn't exit before the
            // write lands.
            if let Err(err) = session.save().await {
                eprintln!("Bracket changed but not synced: {err}");
            }

            render::print_bracket(&session.snapshot());
            ExitCode::SUCCESS
        }
        Outcome::Denied(reason) => {
            println!("{reason}");
            ExitCode::FAILURE
        }
    }
}
