//! The pool variant: 8-ball on a rectangular table, 15 numbered balls
//! plus the cue ball. Physics resolution is a pure function of
//! `(PoolTableState, ShotParams) -> (PoolTableState, Vec<PoolEvent>)`,
//! deliberately simplified per the runtime's documented scope: no
//! ball-on-ball collision transfer beyond capture-by-proximity, no
//! spin-induced curve. It exists to make shot *outcomes* deterministic
//! and server-authoritative, not to model real physics.

use serde::{Deserialize, Serialize};

use stakeboard_core::{Error, Result};

use crate::intent::Intent;

pub const TABLE_WIDTH: f64 = 2.0;
pub const TABLE_HEIGHT: f64 = 1.0;
const POCKET_RADIUS: f64 = 0.06;
const BALL_RADIUS: f64 = 0.028;

fn pockets() -> [(f64, f64); 6] {
    [
        (0.0, 0.0),
        (TABLE_WIDTH / 2.0, 0.0),
        (TABLE_WIDTH, 0.0),
        (0.0, TABLE_HEIGHT),
        (TABLE_WIDTH / 2.0, TABLE_HEIGHT),
        (TABLE_WIDTH, TABLE_HEIGHT),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Group {
    Solids,
    Stripes,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub number: u8,
    pub x: f64,
    pub y: f64,
    pub pocketed: bool,
}

fn group_of_number(number: u8) -> Option<Group> {
    match number {
        1..=7 => Some(Group::Solids),
        9..=15 => Some(Group::Stripes),
        _ => None,
    }
}

impl Ball {
    fn group(&self) -> Option<Group> {
        group_of_number(self.number)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShotParams {
    pub angle: f64,
    pub power: f64,
    pub spin_x: f64,
    pub spin_y: f64,
}

impl ShotParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..std::f64::consts::TAU).contains(&self.angle) {
            return Err(Error::ShotParamOutOfBounds("angle"));
        }
        if !(0.0..=1.0).contains(&self.power) {
            return Err(Error::ShotParamOutOfBounds("power"));
        }
        if !(-1.0..=1.0).contains(&self.spin_x) {
            return Err(Error::ShotParamOutOfBounds("spin_x"));
        }
        if !(-1.0..=1.0).contains(&self.spin_y) {
            return Err(Error::ShotParamOutOfBounds("spin_y"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolTableState {
    pub cue_ball: (f64, f64),
    pub cue_pocketed: bool,
    pub balls: Vec<Ball>,
    pub turn: usize,
    pub groups: [Option<Group>; 2],
    pub ball_in_hand: bool,
    pub opened: bool,
}

impl PoolTableState {
    pub fn rack() -> PoolTableState {
        let mut balls = Vec::with_capacity(15);
        let start_x = TABLE_WIDTH * 0.75;
        let spacing = BALL_RADIUS * 2.1;
        let mut number = 1u8;
        for row in 0..5u32 {
            for col in 0..=row {
                let x = start_x + row as f64 * spacing * 0.87;
                let y = TABLE_HEIGHT / 2.0 - (row as f64 * spacing) / 2.0 + col as f64 * spacing;
                balls.push(Ball { number, x, y, pocketed: false });
                number += 1;
            }
        }
        PoolTableState {
            cue_ball: (TABLE_WIDTH * 0.25, TABLE_HEIGHT / 2.0),
            cue_pocketed: false,
            balls,
            turn: 0,
            groups: [None, None],
            ball_in_hand: false,
            opened: true,
        }
    }

    pub fn current_turn_seat(&self) -> usize {
        self.turn
    }

    fn other_seat(seat: usize) -> usize {
        1 - seat
    }
}

pub enum PoolEvent {
    BallPocketed { number: u8 },
    CuePocketed,
    GroupsAssigned { groups: [Group; 2] },
    EightPocketed,
}

pub struct PoolApplyResult {
    pub events: Vec<PoolEvent>,
    pub terminal: Option<PoolTerminal>,
}

pub struct PoolTerminal {
    pub winner_seat: Option<usize>,
    pub win_type: stakeboard_core::types::WinType,
}

/// The pure physics function the runtime documents: given the table
/// state and a legal shot, returns the resulting table state plus the
/// events it produced. A simplified deterministic arbiter — straight-
/// line travel with elastic wall reflection, capture when a ball's
/// center passes within `POCKET_RADIUS` of a pocket, no ball-to-ball
/// momentum transfer.
pub fn resolve_shot(mut table: PoolTableState, shot: ShotParams) -> (PoolTableState, Vec<PoolEvent>) {
    let mut events = Vec::new();
    let distance = shot.power * (TABLE_WIDTH.max(TABLE_HEIGHT)) * 1.5;
    let (mut x, mut y) = table.cue_ball;
    let mut dx = shot.angle.cos() * distance;
    let mut dy = shot.angle.sin() * distance;

    // Reflect off the rails until the travel budget is spent.
    let mut remaining = (dx * dx + dy * dy).sqrt();
    let step = BALL_RADIUS;
    while remaining > 0.0 {
        let len = (dx * dx + dy * dy).sqrt().max(1e-9);
        let (ux, uy) = (dx / len, dy / len);
        x += ux * step;
        y += uy * step;
        remaining -= step;

        if x < BALL_RADIUS || x > TABLE_WIDTH - BALL_RADIUS {
            dx = -dx;
        }
        if y < BALL_RADIUS || y > TABLE_HEIGHT - BALL_RADIUS {
            dy = -dy;
        }
        x = x.clamp(BALL_RADIUS, TABLE_WIDTH - BALL_RADIUS);
        y = y.clamp(BALL_RADIUS, TABLE_HEIGHT - BALL_RADIUS);

        for pocket in pockets() {
            let d = ((x - pocket.0).powi(2) + (y - pocket.1).powi(2)).sqrt();
            if d < POCKET_RADIUS {
                table.cue_pocketed = true;
                events.push(PoolEvent::CuePocketed);
                remaining = 0.0;
                break;
            }
        }
        if table.cue_pocketed {
            break;
        }

        for ball in table.balls.iter_mut().filter(|b| !b.pocketed) {
            let d = ((x - ball.x).powi(2) + (y - ball.y).powi(2)).sqrt();
            if d < BALL_RADIUS * 2.0 {
                // Capture-by-proximity: the struck ball inherits the
                // remaining travel and is evaluated for pocketing at
                // its own rest position; the cue ball stops here.
                let travel = remaining.min(distance * 0.4);
                ball.x = (ball.x + ux * travel).clamp(BALL_RADIUS, TABLE_WIDTH - BALL_RADIUS);
                ball.y = (ball.y + uy * travel).clamp(BALL_RADIUS, TABLE_HEIGHT - BALL_RADIUS);
                for pocket in pockets() {
                    let pd = ((ball.x - pocket.0).powi(2) + (ball.y - pocket.1).powi(2)).sqrt();
                    if pd < POCKET_RADIUS {
                        ball.pocketed = true;
                        if ball.number == 8 {
                            events.push(PoolEvent::EightPocketed);
                        } else {
                            events.push(PoolEvent::BallPocketed { number: ball.number });
                        }
                        break;
                    }
                }
                remaining = 0.0;
                break;
            }
        }
    }

    table.cue_ball = (x, y);
    if table.cue_pocketed {
        table.ball_in_hand = true;
    }
    (table, events)
}

impl PoolTableState {
    pub fn apply(&mut self, seat: usize, intent: &Intent) -> Result<PoolApplyResult> {
        match intent {
            Intent::PlaceCueBall { x, y } => self.place_cue_ball(seat, *x, *y),
            Intent::TakeShot { angle, power, spin_x, spin_y } => {
                self.take_shot(seat, ShotParams { angle: *angle, power: *power, spin_x: *spin_x, spin_y: *spin_y })
            }
            _ => Err(Error::IllegalMove("intent not valid for the pool variant".into())),
        }
    }

    fn place_cue_ball(&mut self, _seat: usize, x: f64, y: f64) -> Result<PoolApplyResult> {
        if !self.ball_in_hand {
            return Err(Error::IllegalMove("ball-in-hand not granted".into()));
        }
        if !(0.0..=TABLE_WIDTH).contains(&x) || !(0.0..=TABLE_HEIGHT).contains(&y) {
            return Err(Error::ShotParamOutOfBounds("cue ball position"));
        }
        self.cue_ball = (x, y);
        self.cue_pocketed = false;
        self.ball_in_hand = false;
        Ok(PoolApplyResult { events: vec![], terminal: None })
    }

    fn take_shot(&mut self, seat: usize, shot: ShotParams) -> Result<PoolApplyResult> {
        shot.validate()?;
        if self.ball_in_hand {
            return Err(Error::IllegalMove("cue ball must be placed before shooting".into()));
        }

        let was_open = self.opened;
        let my_group = self.groups[seat];
        let (next_table, events) = resolve_shot(self.clone(), shot);
        *self = next_table;

        let pocketed_numbers: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                PoolEvent::BallPocketed { number } => Some(*number),
                _ => None,
            })
            .collect();
        let eight_pocketed = events.iter().any(|e| matches!(e, PoolEvent::EightPocketed));

        let mut out_events = events;

        if was_open && !pocketed_numbers.is_empty() {
            if let Some(group) = group_of_number(pocketed_numbers[0]) {
                self.groups[seat] = Some(group);
                self.groups[Self::other_seat(seat)] = Some(match group {
                    Group::Solids => Group::Stripes,
                    Group::Stripes => Group::Solids,
                });
                self.opened = false;
                out_events.push(PoolEvent::GroupsAssigned {
                    groups: [self.groups[0].unwrap(), self.groups[1].unwrap()],
                });
            }
        }

        if eight_pocketed {
            let group_cleared = my_group.is_some_and(|g| {
                !self.balls.iter().any(|b| b.group() == Some(g) && !b.pocketed)
            });
            if self.cue_pocketed || !group_cleared {
                return Ok(PoolApplyResult {
                    events: out_events,
                    terminal: Some(PoolTerminal { winner_seat: Some(Self::other_seat(seat)), win_type: stakeboard_core::types::WinType::Classic }),
                });
            }
            return Ok(PoolApplyResult {
                events: out_events,
                terminal: Some(PoolTerminal { winner_seat: Some(seat), win_type: stakeboard_core::types::WinType::Classic }),
            });
        }

        let own_ball_pocketed = !was_open
            && my_group
                .map(|g| pocketed_numbers.iter().any(|n| group_of_number(*n) == Some(g)))
                .unwrap_or(!pocketed_numbers.is_empty());

        if self.cue_pocketed {
            self.ball_in_hand = true;
            self.turn = Self::other_seat(seat);
        } else if !own_ball_pocketed {
            self.turn = Self::other_seat(seat);
        }

        Ok(PoolApplyResult { events: out_events, terminal: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shot_params_reject_out_of_range_angle() {
        let shot = ShotParams { angle: 7.0, power: 0.5, spin_x: 0.0, spin_y: 0.0 };
        assert!(matches!(shot.validate(), Err(Error::ShotParamOutOfBounds(_))));
    }

    #[test]
    fn shot_params_reject_out_of_range_power() {
        let shot = ShotParams { angle: 0.0, power: 1.5, spin_x: 0.0, spin_y: 0.0 };
        assert!(matches!(shot.validate(), Err(Error::ShotParamOutOfBounds(_))));
    }

    #[test]
    fn cue_pocketed_grants_ball_in_hand_and_passes_turn() {
        let mut table = PoolTableState::rack();
        table.cue_ball = (POCKET_RADIUS / 2.0, POCKET_RADIUS / 2.0);
        let result = table.take_shot(0, ShotParams { angle: 0.0, power: 0.01, spin_x: 0.0, spin_y: 0.0 }).unwrap();
        assert!(table.ball_in_hand);
        assert_eq!(table.turn, 1);
        assert!(result.events.iter().any(|e| matches!(e, PoolEvent::CuePocketed)));
    }

    #[test]
    fn placing_cue_ball_without_ball_in_hand_is_illegal() {
        let mut table = PoolTableState::rack();
        let err = table.place_cue_ball(0, 0.5, 0.5).unwrap_err();
        assert!(matches!(err, Error::IllegalMove(_)));
    }
}
