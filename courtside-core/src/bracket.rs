use crate::{BracketMatch, Error, PlayerSlot, Result, Side};

/// A single elimination bracket.
///
/// The tree is an ordered sequence of rounds, each an ordered sequence of
/// [`BracketMatch`]es. The bracket size is always a power of two; entrant
/// counts that fall short of it are padded with byes. Byes do not occupy
/// matches: the bye players auto-advance and join the round-1 slot order
/// after the round-0 winners, so round 0 only contains the real opening
/// matches.
///
/// Round 0 is seeded from the entrant list and never derived. For every
/// round `r > 0`, slot `i` draws its players from the winners of the feeding
/// slots `2i` and `2i + 1`, unless a manual-edit pin protects the spot.
/// Derivation happens in [`rebuild`], not at mutation time, so several edits
/// can be applied before a single recompute.
///
/// [`rebuild`]: Self::rebuild
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BracketTree {
    rounds: Vec<Vec<BracketMatch>>,
    bye_players: Vec<String>,
    bracket_size: usize,
}

impl BracketTree {
    /// Creates a new `BracketTree` seeded from the given entrants.
    ///
    /// The bracket size becomes the next power of two that fits all
    /// entrants. The first `bracket_size - entrants` entrants receive a bye
    /// and auto-advance into round 1; the remaining entrants are paired in
    /// order into the round-0 matches. All matches start without a winner
    /// and with empty scores.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoEntrants`] when `entrants` is empty.
    pub fn seed<I>(entrants: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let entrants: Vec<String> = entrants.into_iter().collect();
        if entrants.is_empty() {
            return Err(Error::NoEntrants);
        }

        let bracket_size = entrants.len().next_power_of_two().max(2);
        let num_byes = bracket_size - entrants.len();

        log::debug!(
            "Seeding bracket with {} entrants ({} byes, size {})",
            entrants.len(),
            num_byes,
            bracket_size
        );

        let mut entrants = entrants.into_iter();
        let bye_players: Vec<String> = entrants.by_ref().take(num_byes).collect();

        let mut opening = Vec::with_capacity((bracket_size - num_byes) / 2);
        while let Some(player1) = entrants.next() {
            // The playing count is always even: 2n - next_power_of_two(n).
            let player2 = entrants.next().expect("odd number of playing entrants");
            opening.push(BracketMatch::new(
                PlayerSlot::Player(player1),
                PlayerSlot::Player(player2),
            ));
        }

        let mut this = Self {
            rounds: vec![opening],
            bye_players,
            bracket_size,
        };

        for round in 1..this.total_rounds() {
            let matches = this.expected_matches(round);
            this.rounds
                .push((0..matches).map(|_| BracketMatch::default()).collect());
        }

        Ok(this)
    }

    /// Resumes a bracket from previously stored rounds.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] when the shape of `rounds` does not fit
    /// `bracket_size`, or when a recorded winner is not one of the players of
    /// its match.
    pub fn resume(
        bracket_size: usize,
        bye_players: Vec<String>,
        rounds: Vec<Vec<BracketMatch>>,
    ) -> Result<Self> {
        if !bracket_size.is_power_of_two() || bracket_size < 2 {
            return Err(Error::InvalidBracketSize(bracket_size));
        }

        let this = Self {
            rounds,
            bye_players,
            bracket_size,
        };

        log::debug!(
            "Trying to resume bracket of size {} with {} rounds",
            bracket_size,
            this.rounds.len()
        );

        let expected = this.total_rounds();
        if this.rounds.len() != expected {
            return Err(Error::InvalidRoundCount {
                expected,
                found: this.rounds.len(),
            });
        }

        // Round-0 winners plus byes must exactly fill the round-1 slots.
        let feeders = this.rounds[0].len() + this.bye_players.len();
        if feeders != bracket_size / 2 {
            return Err(Error::InvalidMatchCount {
                round: 0,
                expected: (bracket_size / 2).saturating_sub(this.bye_players.len()),
                found: this.rounds[0].len(),
            });
        }

        for round in 1..expected {
            let found = this.rounds[round].len();
            let expected = this.expected_matches(round);
            if found != expected {
                return Err(Error::InvalidMatchCount {
                    round,
                    expected,
                    found,
                });
            }
        }

        for (round, matches) in this.rounds.iter().enumerate() {
            for (slot, m) in matches.iter().enumerate() {
                if let Some(winner) = &m.winner {
                    if !m.has_player(winner) {
                        return Err(Error::InvalidWinner { round, slot });
                    }
                }
            }
        }

        Ok(this)
    }

    /// Returns the bracket size, always a power of two.
    #[inline]
    pub fn bracket_size(&self) -> usize {
        self.bracket_size
    }

    /// Returns the number of rounds in the bracket.
    #[inline]
    pub fn total_rounds(&self) -> usize {
        self.bracket_size.ilog2() as usize
    }

    /// Returns the players that received a bye.
    #[inline]
    pub fn bye_players(&self) -> &[String] {
        &self.bye_players
    }

    /// Returns all rounds of the bracket.
    #[inline]
    pub fn rounds(&self) -> &[Vec<BracketMatch>] {
        &self.rounds
    }

    /// Returns a reference to the match at `slot` within `round`.
    pub fn get(&self, round: usize, slot: usize) -> Option<&BracketMatch> {
        self.rounds.get(round)?.get(slot)
    }

    fn get_mut(&mut self, round: usize, slot: usize) -> Option<&mut BracketMatch> {
        self.rounds.get_mut(round)?.get_mut(slot)
    }

    /// The number of matches a derived round (`round >= 1`) must contain.
    /// Round 0 is validated separately: byes never occupy matches, so it
    /// holds only the real opening pairings.
    fn expected_matches(&self, round: usize) -> usize {
        debug_assert!(round >= 1);

        self.bracket_size >> (round + 1)
    }

    /// Records `candidate` as the winner of the match at (`round`, `slot`).
    ///
    /// Selecting the current winner again is an *unselect*: the match loses
    /// its winner and scores, and every later round is cleared wholesale
    /// (winners, scores, derived player spots and manual-edit pins), undoing
    /// everything this result ever fed forward.
    ///
    /// A new selection only records the winner; propagation into the next
    /// round happens on the next [`rebuild`] call.
    ///
    /// Unknown candidates and out-of-range indices are silent no-ops.
    ///
    /// [`rebuild`]: Self::rebuild
    pub fn select_winner(&mut self, round: usize, slot: usize, candidate: &str) {
        let Some(m) = self.get_mut(round, slot) else {
            log::debug!("select_winner: no match at round {round} slot {slot}");
            return;
        };

        if !m.has_player(candidate) {
            log::debug!("select_winner: {candidate:?} is not a player of round {round} slot {slot}");
            return;
        }

        if m.winner.as_deref() == Some(candidate) {
            m.clear_result();
            for later in self.rounds.iter_mut().skip(round + 1) {
                for m in later.iter_mut() {
                    m.clear_derived();
                }
            }
        } else {
            m.winner = Some(candidate.to_owned());
        }
    }

    /// Recomputes every round `r >= 1` from the round `r - 1` winners, plus
    /// the bye list for round 1.
    ///
    /// A non-pinned spot always mirrors its feed: it picks up the winner that
    /// now feeds it and drops back to to-be-decided when that feeder has no
    /// winner anymore. A spot whose manual-edit pin is set is never touched.
    /// A match whose recorded winner no longer occupies one of its spots
    /// after the update loses its result. Calling `rebuild` repeatedly
    /// without intervening mutations converges to the same state.
    pub fn rebuild(&mut self) {
        for round in 1..self.total_rounds() {
            let matches = self.expected_matches(round);

            // Repair a round that is missing or mis-sized, e.g. from a
            // document written by an older page.
            if self.rounds.get(round).map_or(true, |r| r.len() != matches) {
                while self.rounds.len() <= round {
                    self.rounds.push(Vec::new());
                }
                self.rounds[round] = (0..matches).map(|_| BracketMatch::default()).collect();
            }

            let incoming = self.incoming_slots(round);

            for (slot, m) in self.rounds[round].iter_mut().enumerate() {
                let new_p1 = incoming[slot * 2].clone();
                let new_p2 = incoming[slot * 2 + 1].clone();

                if !m.manually_edited_p1 {
                    m.player1 = new_p1;
                }
                if !m.manually_edited_p2 {
                    m.player2 = new_p2;
                }

                // A changed feed can leave a recorded winner that no longer
                // plays this match. Drop the stale result; the cleared winner
                // then feeds onwards when the next round is processed.
                if let Some(winner) = &m.winner {
                    if !m.has_player(winner) {
                        m.clear_result();
                    }
                }
            }
        }
    }

    /// Returns the ordered slot list feeding `round`: for round 1 the
    /// round-0 winners followed by the bye players, for later rounds the
    /// winners of the previous round.
    fn incoming_slots(&self, round: usize) -> Vec<PlayerSlot> {
        debug_assert!(round >= 1);

        let prev = &self.rounds[round - 1];
        let mut slots: Vec<PlayerSlot> = prev
            .iter()
            .map(|m| PlayerSlot::new(m.winner.clone()))
            .collect();

        if round == 1 {
            slots.extend(
                self.bye_players
                    .iter()
                    .map(|p| PlayerSlot::Player(p.clone())),
            );
        }

        slots
    }

    /// Overwrites the player name on one side of a match.
    ///
    /// The new name must be non-empty after trimming, otherwise the call is a
    /// no-op. A successful edit sets the spot's manual-edit pin, and when the
    /// match's winner was the renamed player the winner follows the rename.
    pub fn edit_player_name(&mut self, round: usize, slot: usize, side: Side, new_name: &str) {
        let name = new_name.trim();
        if name.is_empty() {
            log::debug!("edit_player_name: rejecting empty name for round {round} slot {slot}");
            return;
        }

        let Some(m) = self.get_mut(round, slot) else {
            return;
        };

        let old = m.player_mut(side).take();
        *m.player_mut(side) = PlayerSlot::Player(name.to_owned());
        m.set_manually_edited(side);

        if let Some(old) = old.as_player() {
            if m.winner.as_deref() == Some(old) {
                m.winner = Some(name.to_owned());
            }
        }
    }

    /// Overwrites the score on one side of a match. No propagation.
    pub fn edit_score(&mut self, round: usize, slot: usize, side: Side, value: &str) {
        if let Some(m) = self.get_mut(round, slot) {
            *m.score_mut(side) = value.to_owned();
        }
    }

    /// Overwrites the scheduled time of a match. No propagation.
    pub fn edit_time(&mut self, round: usize, slot: usize, value: &str) {
        if let Some(m) = self.get_mut(round, slot) {
            m.scheduled_time = value.to_owned();
        }
    }

    /// Clears the entire tree back to the seeded state: all winners, scores,
    /// times and manual-edit pins are cleared, and every derived round drops
    /// back to undecided spots. Round-0 pairings are kept.
    pub fn reset(&mut self) {
        log::debug!("Resetting bracket to seeded state");

        for (round, matches) in self.rounds.iter_mut().enumerate() {
            for m in matches.iter_mut() {
                if round == 0 {
                    m.clear_result();
                    m.manually_edited_p1 = false;
                    m.manually_edited_p2 = false;
                } else {
                    m.clear_derived();
                }
                m.scheduled_time.clear();
            }
        }
    }

    /// Consumes the tree, returning its raw parts: the bracket size, the bye
    /// players and the rounds.
    pub fn into_parts(self) -> (usize, Vec<String>, Vec<Vec<BracketMatch>>) {
        (self.bracket_size, self.bye_players, self.rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    fn seed(entrants: &[&str]) -> BracketTree {
        BracketTree::seed(names(entrants)).unwrap()
    }

    #[test]
    fn test_seed_no_entrants() {
        assert_eq!(
            BracketTree::seed(Vec::new()).unwrap_err(),
            Error::NoEntrants
        );
    }

    #[test]
    fn test_seed_power_of_two_sizes() {
        for exp in 1..=6u32 {
            let size = 2usize.pow(exp);
            let entrants: Vec<String> = (0..size).map(|i| format!("player-{i}")).collect();

            let mut tree = BracketTree::seed(entrants).unwrap();
            tree.rebuild();

            assert_eq!(tree.bracket_size(), size);
            assert_eq!(tree.total_rounds(), exp as usize);
            assert!(tree.bye_players().is_empty());

            for round in 0..tree.total_rounds() {
                assert_eq!(
                    tree.rounds()[round].len(),
                    size / 2usize.pow(round as u32 + 1),
                    "wrong match count in round {round} for size {size}"
                );
            }
        }
    }

    #[test]
    fn test_seed_with_byes() {
        let tree = seed(&["a", "b", "c", "d", "e"]);

        assert_eq!(tree.bracket_size(), 8);
        assert_eq!(tree.total_rounds(), 3);
        assert_eq!(tree.bye_players(), &names(&["a", "b", "c"]));

        // Only d and e actually play round 0.
        assert_eq!(tree.rounds()[0].len(), 1);
        assert_eq!(tree.get(0, 0).unwrap().player1, PlayerSlot::from("d"));
        assert_eq!(tree.get(0, 0).unwrap().player2, PlayerSlot::from("e"));

        assert_eq!(tree.rounds()[1].len(), 2);
        assert_eq!(tree.rounds()[2].len(), 1);
    }

    #[test]
    fn test_bye_slot_order_deterministic() {
        let mut tree = seed(&["a", "b", "c", "d", "e"]);
        tree.select_winner(0, 0, "e");
        tree.rebuild();

        // Slot order: round-0 winners first, then the bye players.
        assert_eq!(tree.get(1, 0).unwrap().player1, PlayerSlot::from("e"));
        assert_eq!(tree.get(1, 0).unwrap().player2, PlayerSlot::from("a"));
        assert_eq!(tree.get(1, 1).unwrap().player1, PlayerSlot::from("b"));
        assert_eq!(tree.get(1, 1).unwrap().player2, PlayerSlot::from("c"));
    }

    #[test]
    fn test_rebuild_idempotent() {
        let mut tree = seed(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        tree.select_winner(0, 0, "a");
        tree.select_winner(0, 2, "f");

        tree.rebuild();
        let first = tree.clone();
        tree.rebuild();

        assert_eq!(tree, first);
    }

    #[test]
    fn test_propagation() {
        let mut tree = seed(&["a", "b", "c", "d"]);

        tree.select_winner(0, 1, "d");
        // Not propagated until rebuild.
        assert!(tree.get(1, 0).unwrap().player2.is_tbd());

        tree.rebuild();
        assert!(tree.get(1, 0).unwrap().player1.is_tbd());
        assert_eq!(tree.get(1, 0).unwrap().player2, PlayerSlot::from("d"));
    }

    #[test]
    fn test_propagation_respects_manual_pin() {
        let mut tree = seed(&["a", "b", "c", "d"]);

        tree.edit_player_name(1, 0, Side::Player1, "substitute");
        tree.select_winner(0, 0, "a");
        tree.rebuild();

        // The pinned spot keeps the hand-entered name.
        assert_eq!(
            tree.get(1, 0).unwrap().player1,
            PlayerSlot::from("substitute")
        );
        assert!(tree.get(1, 0).unwrap().manually_edited_p1);
    }

    #[test]
    fn test_select_winner_unknown_candidate_is_noop() {
        let mut tree = seed(&["a", "b", "c", "d"]);
        let before = tree.clone();

        tree.select_winner(0, 0, "nobody");
        tree.select_winner(9, 0, "a");
        tree.select_winner(0, 9, "a");
        // A TBD spot can never be selected.
        tree.select_winner(1, 0, "TBD");

        assert_eq!(tree, before);
    }

    #[test]
    fn test_select_winner_change() {
        let mut tree = seed(&["a", "b", "c", "d"]);

        tree.select_winner(0, 0, "a");
        assert_eq!(tree.get(0, 0).unwrap().winner.as_deref(), Some("a"));

        // Selecting the other player is a change, not an unselect.
        tree.select_winner(0, 0, "b");
        assert_eq!(tree.get(0, 0).unwrap().winner.as_deref(), Some("b"));
    }

    #[test]
    fn test_winner_change_drops_stale_downstream_result() {
        let mut tree = seed(&["a", "b", "c", "d", "e", "f", "g", "h"]);

        tree.select_winner(0, 0, "a");
        tree.select_winner(0, 1, "c");
        tree.rebuild();
        tree.select_winner(1, 0, "a");
        tree.rebuild();
        assert_eq!(tree.get(2, 0).unwrap().player1, PlayerSlot::from("a"));

        // Changing the upstream winner replaces the feeding player, so the
        // downstream result recorded for "a" no longer holds.
        tree.select_winner(0, 0, "b");
        tree.rebuild();

        let m = tree.get(1, 0).unwrap();
        assert_eq!(m.player1, PlayerSlot::from("b"));
        assert_eq!(m.winner, None);
        assert!(m.score1.is_empty() && m.score2.is_empty());

        // With the round-1 result gone, its spot two rounds downstream drains
        // back to to-be-decided instead of keeping the invalidated "a".
        assert!(tree.get(2, 0).unwrap().player1.is_tbd());

        let first = tree.clone();
        tree.rebuild();
        assert_eq!(tree, first);
    }

    #[test]
    fn test_rename_propagates_on_rebuild() {
        let mut tree = seed(&["a", "b", "c", "d"]);

        tree.select_winner(0, 0, "a");
        tree.rebuild();
        assert_eq!(tree.get(1, 0).unwrap().player1, PlayerSlot::from("a"));

        tree.edit_player_name(0, 0, Side::Player1, "anna");
        tree.rebuild();

        // The rename followed the winner, so the derived spot updates too.
        assert_eq!(tree.get(1, 0).unwrap().player1, PlayerSlot::from("anna"));
        assert!(!tree.get(1, 0).unwrap().manually_edited_p1);
    }

    #[test]
    fn test_unselect_cascade() {
        let mut tree = seed(&["a", "b", "c", "d", "e", "f", "g", "h"]);

        tree.select_winner(0, 0, "a");
        tree.select_winner(0, 1, "c");
        tree.rebuild();
        tree.edit_score(0, 0, Side::Player1, "21");
        tree.edit_score(0, 0, Side::Player2, "15");
        tree.select_winner(1, 0, "a");
        tree.rebuild();
        tree.edit_player_name(2, 0, Side::Player1, "stand-in");

        assert_eq!(tree.get(1, 0).unwrap().winner.as_deref(), Some("a"));
        assert!(tree.get(2, 0).unwrap().manually_edited_p1);

        // Unselect the round-0 result; everything downstream unwinds in the
        // same call.
        tree.select_winner(0, 0, "a");

        let m0 = tree.get(0, 0).unwrap();
        assert_eq!(m0.winner, None);
        assert!(m0.score1.is_empty());
        assert!(m0.score2.is_empty());
        assert_eq!(m0.player1, PlayerSlot::from("a"));

        for round in 1..3 {
            for m in &tree.rounds()[round] {
                assert_eq!(m.winner, None, "round {round}");
                assert!(m.player1.is_tbd() && m.player2.is_tbd(), "round {round}");
                assert!(m.score1.is_empty() && m.score2.is_empty());
                assert!(!m.manually_edited_p1 && !m.manually_edited_p2);
            }
        }
    }

    #[test]
    fn test_rename_keeps_winner() {
        let mut tree = seed(&["a", "b", "c", "d"]);

        tree.select_winner(0, 0, "a");
        tree.edit_player_name(0, 0, Side::Player1, "anna");

        let m = tree.get(0, 0).unwrap();
        assert_eq!(m.player1, PlayerSlot::from("anna"));
        assert_eq!(m.winner.as_deref(), Some("anna"));
        assert!(m.manually_edited_p1);
    }

    #[test]
    fn test_edit_player_name_rejects_blank() {
        let mut tree = seed(&["a", "b", "c", "d"]);
        let before = tree.clone();

        tree.edit_player_name(0, 0, Side::Player1, "   ");
        assert_eq!(tree, before);

        tree.edit_player_name(0, 0, Side::Player1, "  anna  ");
        assert_eq!(tree.get(0, 0).unwrap().player1, PlayerSlot::from("anna"));
    }

    #[test]
    fn test_edit_score_and_time() {
        let mut tree = seed(&["a", "b"]);

        tree.edit_score(0, 0, Side::Player1, "3");
        tree.edit_score(0, 0, Side::Player2, "1");
        tree.edit_time(0, 0, "Fri 18:00");

        let m = tree.get(0, 0).unwrap();
        assert_eq!(m.score1, "3");
        assert_eq!(m.score2, "1");
        assert_eq!(m.scheduled_time, "Fri 18:00");
        assert_eq!(m.winner, None);

        // Out of range writes go nowhere.
        tree.edit_score(5, 0, Side::Player1, "9");
        tree.edit_time(0, 7, "never");
    }

    #[test]
    fn test_reset() {
        let mut tree = seed(&["a", "b", "c", "d"]);
        let seeded = tree.clone();

        tree.select_winner(0, 0, "a");
        tree.select_winner(0, 1, "d");
        tree.rebuild();
        tree.edit_score(0, 0, Side::Player1, "2");
        tree.edit_time(1, 0, "Sat 10:00");
        tree.edit_player_name(1, 0, Side::Player2, "ringer");

        tree.reset();
        assert_eq!(tree, seeded);
    }

    #[test]
    fn test_resume_validates_shape() {
        let tree = seed(&["a", "b", "c", "d", "e"]);
        let (size, byes, rounds) = tree.clone().into_parts();

        assert_eq!(
            BracketTree::resume(size, byes.clone(), rounds.clone()).unwrap(),
            tree
        );

        assert_eq!(
            BracketTree::resume(6, byes.clone(), rounds.clone()).unwrap_err(),
            Error::InvalidBracketSize(6)
        );

        let mut short = rounds.clone();
        short.pop();
        assert_eq!(
            BracketTree::resume(size, byes.clone(), short).unwrap_err(),
            Error::InvalidRoundCount {
                expected: 3,
                found: 2
            }
        );

        let mut wide = rounds.clone();
        wide[1].push(BracketMatch::default());
        assert_eq!(
            BracketTree::resume(size, byes.clone(), wide).unwrap_err(),
            Error::InvalidMatchCount {
                round: 1,
                expected: 2,
                found: 3
            }
        );

        let mut bad_winner = rounds;
        bad_winner[0][0].winner = Some("zz".to_owned());
        assert_eq!(
            BracketTree::resume(size, byes, bad_winner).unwrap_err(),
            Error::InvalidWinner { round: 0, slot: 0 }
        );
    }

    #[test]
    fn test_rebuild_repairs_missing_rounds() {
        let mut tree = seed(&["a", "b", "c", "d", "e", "f", "g", "h"]);

        // Simulate a document from an older page that never materialized the
        // later rounds.
        tree.rounds.truncate(1);
        tree.select_winner(0, 3, "h");
        tree.rebuild();

        assert_eq!(tree.rounds().len(), 3);
        assert_eq!(tree.rounds()[1].len(), 2);
        assert_eq!(tree.get(1, 1).unwrap().player2, PlayerSlot::from("h"));
    }
}
