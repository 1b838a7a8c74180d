use thiserror::Error;

/// The five error kinds from the error-handling design: each maps to a
/// distinct HTTP status range at the boundary and to a distinct retry
/// policy internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Domain,
    External,
    System,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // -- Validation --
    #[error("malformed phone number")]
    MalformedPhone,
    #[error("stake out of allowed range")]
    StakeOutOfRange,
    #[error("malformed card code")]
    MalformedCard,
    #[error("shot parameter out of bounds: {0}")]
    ShotParamOutOfBounds(&'static str),
    #[error("pin must be exactly 4 digits")]
    MalformedPin,

    // -- Authorization --
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account locked until {0}")]
    AccountLocked(i64),
    #[error("unknown or expired token")]
    UnknownToken,
    #[error("token not valid for this action")]
    TokenScopeMismatch,

    // -- Domain --
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("unknown account")]
    UnknownAccount,
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("player already has a queued entry")]
    AlreadyQueued,
    #[error("queue entry not found")]
    QueueEntryNotFound,
    #[error("queue entry is no longer live")]
    QueueEntryNotLive,
    #[error("stake mismatch on invite redemption")]
    StakeMismatch,
    #[error("match code is not live")]
    MatchCodeNotLive,
    #[error("match not found")]
    MatchNotFound,
    #[error("match already finished")]
    MatchFinished,
    #[error("not your turn")]
    NotYourTurn,
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("withdrawal below minimum")]
    WithdrawalBelowMinimum,

    // -- External --
    #[error("payment provider unavailable")]
    ProviderUnavailable,
    #[error("sms delivery failed")]
    SmsDeliveryFailed,

    // -- System --
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            MalformedPhone | StakeOutOfRange | MalformedCard | ShotParamOutOfBounds(_)
            | MalformedPin => ErrorKind::Validation,

            InvalidCredentials | AccountLocked(_) | UnknownToken | TokenScopeMismatch => {
                ErrorKind::Authorization
            }

            InsufficientFunds
            | UnknownAccount
            | NonPositiveAmount
            | AlreadyQueued
            | QueueEntryNotFound
            | QueueEntryNotLive
            | StakeMismatch
            | MatchCodeNotLive
            | MatchNotFound
            | MatchFinished
            | NotYourTurn
            | IllegalMove(_)
            | WithdrawalBelowMinimum => ErrorKind::Domain,

            ProviderUnavailable | SmsDeliveryFailed => ErrorKind::External,

            Storage(_) | Internal(_) => ErrorKind::System,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
