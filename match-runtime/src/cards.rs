//! The cards variant: a two-player, 52-card shedding game. A target
//! suit is bound to the match at deal time; playing the matching 7
//! triggers a "chop" — the game ends immediately and the lower hand
//! total (by the rank-to-point table below) wins.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use stakeboard_core::{Error, Result};

use crate::intent::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    fn code(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }

    fn from_code(c: char) -> Result<Suit> {
        match c {
            'C' => Ok(Suit::Clubs),
            'D' => Ok(Suit::Diamonds),
            'H' => Ok(Suit::Hearts),
            'S' => Ok(Suit::Spades),
            _ => Err(Error::MalformedCard),
        }
    }

    fn random() -> Suit {
        let idx = rand::thread_rng().gen_range(0..Suit::ALL.len());
        Suit::ALL[idx]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven, Rank::Eight,
        Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];

    fn code(self) -> char {
        match self {
            Rank::Two => '2', Rank::Three => '3', Rank::Four => '4', Rank::Five => '5',
            Rank::Six => '6', Rank::Seven => '7', Rank::Eight => '8', Rank::Nine => '9',
            Rank::Ten => 'T', Rank::Jack => 'J', Rank::Queen => 'Q', Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    fn from_code(c: char) -> Result<Rank> {
        match c {
            '2' => Ok(Rank::Two), '3' => Ok(Rank::Three), '4' => Ok(Rank::Four),
            '5' => Ok(Rank::Five), '6' => Ok(Rank::Six), '7' => Ok(Rank::Seven),
            '8' => Ok(Rank::Eight), '9' => Ok(Rank::Nine), 'T' => Ok(Rank::Ten),
            'J' => Ok(Rank::Jack), 'Q' => Ok(Rank::Queen), 'K' => Ok(Rank::King),
            'A' => Ok(Rank::Ace),
            _ => Err(Error::MalformedCard),
        }
    }

    /// Chop-scoring point value: Ace=1, 2-10=face value, J/Q/K=10.
    pub fn point_value(self) -> u32 {
        match self {
            Rank::Ace => 1,
            Rank::Jack | Rank::Queen | Rank::King => 10,
            other => Rank::ALL.iter().position(|r| *r == other).unwrap() as u32 + 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn code(&self) -> String {
        format!("{}{}", self.rank.code(), self.suit.code())
    }

    pub fn parse(code: &str) -> Result<Card> {
        let mut chars = code.chars();
        let rank = chars.next().ok_or(Error::MalformedCard)?;
        let suit = chars.next().ok_or(Error::MalformedCard)?;
        if chars.next().is_some() {
            return Err(Error::MalformedCard);
        }
        Ok(Card { rank: Rank::from_code(rank)?, suit: Suit::from_code(suit)? })
    }

    fn is_ace(&self) -> bool {
        self.rank == Rank::Ace
    }

    fn is_two(&self) -> bool {
        self.rank == Rank::Two
    }

    fn is_skip(&self) -> bool {
        matches!(self.rank, Rank::Jack | Rank::Eight)
    }
}

fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card { rank, suit });
        }
    }
    deck
}

#[derive(Debug, Clone)]
pub struct DealtHands {
    pub hands: [Vec<Card>; 2],
    pub draw_pile: Vec<Card>,
    pub discard_top: Card,
    pub target_suit: Suit,
}

/// Shuffles a full deck, deals 7 to each player, and turns up one card
/// to start the discard pile. The target suit (used for chop scoring)
/// is drawn independently, uniformly at random.
pub fn deal() -> DealtHands {
    let mut deck = full_deck();
    deck.shuffle(&mut rand::thread_rng());

    let hand_a = deck.split_off(deck.len() - 7);
    let hand_b = deck.split_off(deck.len() - 7);
    let discard_top = deck.pop().expect("38 cards remain after dealing 14 of 52");

    DealtHands {
        hands: [hand_a, hand_b],
        draw_pile: deck,
        discard_top,
        target_suit: Suit::random(),
    }
}

/// A player's final-hand point total at a chop, or at a draw-pile
/// exhaustion draw.
pub fn hand_points(hand: &[Card]) -> u32 {
    hand.iter().map(|c| c.rank.point_value()).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardsState {
    pub hands: [Vec<Card>; 2],
    pub draw_pile: Vec<Card>,
    pub discard_pile: Vec<Card>,
    pub turn: usize,
    pub current_suit: Suit,
    pub draw_stack: u32,
    pub target_suit: Suit,
    /// Set once a draw has been taken this turn but not yet played or
    /// passed; only the drawn card itself or a pass is legal next.
    pub drawn_this_turn: Option<Card>,
}

impl CardsState {
    pub fn deal() -> CardsState {
        let dealt = deal();
        CardsState {
            hands: dealt.hands,
            draw_pile: dealt.draw_pile,
            discard_pile: vec![dealt.discard_top],
            turn: 0,
            current_suit: dealt.discard_top.suit,
            draw_stack: 0,
            target_suit: dealt.target_suit,
            drawn_this_turn: None,
        }
    }

    fn discard_top(&self) -> Card {
        *self.discard_pile.last().expect("discard pile always has at least the opening card")
    }

    fn other_seat(seat: usize) -> usize {
        1 - seat
    }

    fn is_legal_play(&self, card: &Card) -> bool {
        if self.draw_stack > 0 {
            return card.is_two();
        }
        if card.is_ace() {
            return true;
        }
        let top = self.discard_top();
        card.suit == self.current_suit || card.rank == top.rank
    }

    /// Reshuffles the discard pile below the current top card into a
    /// fresh draw pile. The top card itself is never touched.
    fn reshuffle_if_empty(&mut self) {
        if !self.draw_pile.is_empty() {
            return;
        }
        let top = self.discard_pile.pop().expect("discard pile always has at least the opening card");
        let mut rest = std::mem::take(&mut self.discard_pile);
        rest.shuffle(&mut rand::thread_rng());
        self.draw_pile = rest;
        self.discard_pile.push(top);
    }
}

/// Outcome of applying a single intent: events to broadcast, and — if
/// the match just ended — the terminal result.
pub struct CardsApplyResult {
    pub events: Vec<CardsEvent>,
    pub terminal: Option<CardsTerminal>,
}

pub enum CardsEvent {
    CardPlayed { seat: usize, card: Card, declared_suit: Option<Suit> },
    CardsDrawn { seat: usize, cards: Vec<Card> },
    TurnPassed { seat: usize },
}

pub struct CardsTerminal {
    /// `None` means a draw.
    pub winner_seat: Option<usize>,
    pub win_type: stakeboard_core::types::WinType,
}

impl CardsState {
    pub fn current_turn_seat(&self) -> usize {
        self.turn
    }

    pub fn apply(&mut self, seat: usize, intent: &Intent) -> Result<CardsApplyResult> {
        match intent {
            Intent::PlayCard { card: code, declared_suit } => self.play_card(seat, code, *declared_suit),
            Intent::DrawCard => self.draw_card(seat),
            Intent::PassTurn => self.pass_turn(seat),
            _ => Err(Error::IllegalMove("intent not valid for the cards variant".into())),
        }
    }

    fn play_card(&mut self, seat: usize, code: &str, declared_suit: Option<Suit>) -> Result<CardsApplyResult> {
        let card = Card::parse(code)?;
        if self.drawn_this_turn.is_some_and(|drawn| drawn != card) {
            return Err(Error::IllegalMove("only the just-drawn card or a pass is legal".into()));
        }
        let hand = &mut self.hands[seat];
        let pos = hand.iter().position(|c| *c == card).ok_or(Error::IllegalMove("card not in hand".into()))?;
        if !self.is_legal_play(&card) {
            return Err(Error::IllegalMove("card does not match suit, rank, or open draw-stack".into()));
        }
        if card.is_ace() && declared_suit.is_none() {
            return Err(Error::IllegalMove("an ace requires a declared suit".into()));
        }

        hand.remove(pos);
        self.discard_pile.push(card);
        self.drawn_this_turn = None;

        if card.is_ace() {
            self.current_suit = declared_suit.expect("checked above");
            self.draw_stack = 0;
        } else {
            self.current_suit = card.suit;
        }
        if card.is_two() {
            self.draw_stack += 2;
        }

        let mut events = vec![CardsEvent::CardPlayed { seat, card, declared_suit: if card.is_ace() { declared_suit } else { None } }];

        if card.suit == self.target_suit && card.rank == Rank::Seven {
            let mine = hand_points(&self.hands[seat]);
            let theirs = hand_points(&self.hands[Self::other_seat(seat)]);
            let winner_seat = match mine.cmp(&theirs) {
                std::cmp::Ordering::Less => Some(seat),
                std::cmp::Ordering::Greater => Some(Self::other_seat(seat)),
                std::cmp::Ordering::Equal => None,
            };
            return Ok(CardsApplyResult { events, terminal: Some(CardsTerminal { winner_seat, win_type: stakeboard_core::types::WinType::Chop }) });
        }

        if self.hands[seat].is_empty() {
            return Ok(CardsApplyResult { events, terminal: Some(CardsTerminal { winner_seat: Some(seat), win_type: stakeboard_core::types::WinType::Classic }) });
        }

        if !card.is_skip() {
            self.turn = Self::other_seat(seat);
            events.push(CardsEvent::TurnPassed { seat: self.turn });
        }

        Ok(CardsApplyResult { events, terminal: None })
    }

    fn draw_card(&mut self, seat: usize) -> Result<CardsApplyResult> {
        if self.drawn_this_turn.is_some() {
            return Err(Error::IllegalMove("already drew this turn".into()));
        }
        let to_draw = if self.draw_stack > 0 { self.draw_stack } else { 1 };

        let mut drawn = Vec::with_capacity(to_draw as usize);
        for _ in 0..to_draw {
            self.reshuffle_if_empty();
            let Some(card) = self.draw_pile.pop() else {
                // Both piles exhausted: the hand plays on with whatever
                // it drew; the match ends as a draw on the caller's
                // next pass if still unresolved. Nothing further to do
                // here — an empty draw is simply a shorter draw.
                break;
            };
            drawn.push(card);
        }
        if drawn.is_empty() && self.draw_pile.is_empty() && self.discard_pile.len() <= 1 {
            return Ok(CardsApplyResult {
                events: vec![],
                terminal: Some(CardsTerminal { winner_seat: None, win_type: stakeboard_core::types::WinType::Draw }),
            });
        }

        self.hands[seat].extend(drawn.iter().copied());
        let stack_collapsed = self.draw_stack > 0;
        self.draw_stack = 0;
        self.drawn_this_turn = if stack_collapsed { None } else { drawn.last().copied() };

        let mut events = vec![CardsEvent::CardsDrawn { seat, cards: drawn }];
        if stack_collapsed {
            // A collapsed stack consumes the whole turn.
            self.turn = Self::other_seat(seat);
            events.push(CardsEvent::TurnPassed { seat: self.turn });
        }
        Ok(CardsApplyResult { events, terminal: None })
    }

    fn pass_turn(&mut self, seat: usize) -> Result<CardsApplyResult> {
        if self.drawn_this_turn.is_none() {
            return Err(Error::IllegalMove("must draw before passing".into()));
        }
        self.drawn_this_turn = None;
        self.turn = Self::other_seat(seat);
        Ok(CardsApplyResult { events: vec![CardsEvent::TurnPassed { seat: self.turn }], terminal: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_code_round_trips() {
        let card = Card { rank: Rank::Ten, suit: Suit::Hearts };
        assert_eq!(Card::parse(&card.code()).unwrap(), card);
    }

    #[test]
    fn malformed_card_code_is_rejected() {
        assert!(matches!(Card::parse("XX"), Err(Error::MalformedCard)));
        assert!(matches!(Card::parse("7"), Err(Error::MalformedCard)));
    }

    #[test]
    fn point_values_match_the_chop_table() {
        assert_eq!(Rank::Ace.point_value(), 1);
        assert_eq!(Rank::Seven.point_value(), 7);
        assert_eq!(Rank::Ten.point_value(), 10);
        assert_eq!(Rank::Jack.point_value(), 10);
        assert_eq!(Rank::King.point_value(), 10);
    }

    #[test]
    fn deal_gives_seven_cards_each_and_one_discard() {
        let state = CardsState::deal();
        assert_eq!(state.hands[0].len(), 7);
        assert_eq!(state.hands[1].len(), 7);
        assert_eq!(state.discard_pile.len(), 1);
        assert_eq!(state.draw_pile.len(), 52 - 14 - 1);
    }

    #[test]
    fn two_played_opens_a_draw_stack_only_twos_are_legal() {
        let mut state = CardsState::deal();
        state.hands[0] = vec![Card { rank: Rank::Two, suit: Suit::Clubs }];
        state.discard_pile = vec![Card { rank: Rank::Nine, suit: Suit::Clubs }];
        state.current_suit = Suit::Clubs;
        state.turn = 0;

        let result = state.apply(0, &Intent::PlayCard { card: "2C".into(), declared_suit: None }).unwrap();
        assert_eq!(state.draw_stack, 2);
        assert!(matches!(result.events[0], CardsEvent::CardPlayed { .. }));
    }

    #[test]
    fn jack_is_a_skip_same_player_keeps_the_turn() {
        let mut state = CardsState::deal();
        state.hands[0] = vec![Card { rank: Rank::Jack, suit: Suit::Clubs }, Card { rank: Rank::Three, suit: Suit::Diamonds }];
        state.discard_pile = vec![Card { rank: Rank::Nine, suit: Suit::Clubs }];
        state.current_suit = Suit::Clubs;
        state.turn = 0;

        state.apply(0, &Intent::PlayCard { card: "JC".into(), declared_suit: None }).unwrap();
        assert_eq!(state.turn, 0);
    }

    #[test]
    fn playing_last_card_is_a_classic_win() {
        let mut state = CardsState::deal();
        state.hands[0] = vec![Card { rank: Rank::Nine, suit: Suit::Clubs }];
        state.discard_pile = vec![Card { rank: Rank::Nine, suit: Suit::Diamonds }];
        state.current_suit = Suit::Diamonds;
        state.turn = 0;

        let result = state.apply(0, &Intent::PlayCard { card: "9C".into(), declared_suit: None }).unwrap();
        let terminal = result.terminal.expect("hand emptied");
        assert_eq!(terminal.winner_seat, Some(0));
        assert!(matches!(terminal.win_type, stakeboard_core::types::WinType::Classic));
    }

    #[test]
    fn chop_card_ends_the_game_lower_total_wins() {
        let mut state = CardsState::deal();
        state.target_suit = Suit::Clubs;
        state.hands[0] = vec![Card { rank: Rank::Seven, suit: Suit::Clubs }, Card { rank: Rank::Two, suit: Suit::Diamonds }];
        state.hands[1] = vec![Card { rank: Rank::King, suit: Suit::Diamonds }];
        state.discard_pile = vec![Card { rank: Rank::Nine, suit: Suit::Clubs }];
        state.current_suit = Suit::Clubs;
        state.turn = 0;

        let result = state.apply(0, &Intent::PlayCard { card: "7C".into(), declared_suit: None }).unwrap();
        let terminal = result.terminal.expect("chop card played");
        assert_eq!(terminal.winner_seat, Some(0));
        assert!(matches!(terminal.win_type, stakeboard_core::types::WinType::Chop));
    }

    #[test]
    fn reshuffle_preserves_the_current_top_card() {
        let mut state = CardsState::deal();
        let top = Card { rank: Rank::Nine, suit: Suit::Diamonds };
        state.discard_pile = vec![Card { rank: Rank::Three, suit: Suit::Hearts }, top];
        state.draw_pile = vec![];

        state.reshuffle_if_empty();
        assert_eq!(state.discard_pile, vec![top]);
        assert_eq!(state.draw_pile.len(), 1);
    }

    #[test]
    fn illegal_card_is_rejected() {
        let mut state = CardsState::deal();
        state.hands[0] = vec![Card { rank: Rank::Four, suit: Suit::Hearts }];
        state.discard_pile = vec![Card { rank: Rank::Nine, suit: Suit::Clubs }];
        state.current_suit = Suit::Clubs;
        state.turn = 0;

        let err = state.apply(0, &Intent::PlayCard { card: "4H".into(), declared_suit: None }).unwrap_err();
        assert!(matches!(err, Error::IllegalMove(_)));
    }
}
