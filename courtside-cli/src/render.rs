use courtside_core::{BracketMatch, BracketTree};
use courtside_session::ContactDirectory;

pub fn print_bracket(tree: &BracketTree) {
    for (index, round) in tree.rounds().iter().enumerate() {
        println!("Round {}", index + 1);

        if index == 0 && !tree.bye_players().is_empty() {
            println!("  byes: {}", tree.bye_players().join(", "));
        }

        for (slot, m) in round.iter().enumerate() {
            print_match(slot, m);
        }

        println!();
    }
}

fn print_match(slot: usize, m: &BracketMatch) {
    let mut line = format!(
        "  [{}] {} {} - {} {}",
        slot,
        m.player1,
        score(&m.score1),
        score(&m.score2),
        m.player2
    );

    if let Some(winner) = &m.winner {
        line.push_str(&format!("  winner: {winner}"));
    }

    if !m.scheduled_time.is_empty() {
        line.push_str(&format!("  @ {}", m.scheduled_time));
    }

    println!("{line}");
}

fn score(score: &str) -> &str {
    if score.is_empty() {
        "-"
    } else {
        score
    }
}

pub fn print_contacts(contacts: &ContactDirectory) {
    if contacts.is_empty() {
        println!("no contacts available");
        return;
    }

    for (player, info) in contacts {
        let mut line = player.clone();

        if !info.email.is_empty() {
            line.push_str(&format!("  {}", info.email));
        }

        if !info.phone.is_empty() {
            line.push_str(&format!("  {}", info.phone));
        }

        println!("{line}");
    }
}
