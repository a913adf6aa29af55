use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError,
    program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq)]
pub enum RaffleError {
    /// The entry payment was below the entrance fee
    #[error("Payment below the entrance fee")]
    InsufficientPayment,

    /// The round is not accepting entries
    #[error("Round is not open for entries")]
    RoundNotOpen,

    /// The upkeep conditions are not satisfied
    #[error("Upkeep is not needed")]
    UpkeepNotNeeded,

    /// The randomness response does not match the outstanding request
    #[error("Unknown randomness request id")]
    UnknownRequest,

    /// No entrants to select a winner from
    #[error("No eligible entrants")]
    NoEligibleEntrants,

    /// The pot transfer to the winner failed
    #[error("Pot transfer failed")]
    TransferFailed,

    /// The winner account does not match the selected entrant
    #[error("Winner account does not match the selected entrant")]
    WinnerAccountMismatch,

    /// The entrant list is at capacity for this round
    #[error("Raffle is full")]
    RaffleFull,

    /// The fulfillment was not signed by the configured oracle authority
    #[error("Caller is not the oracle authority")]
    OracleAuthorityMismatch,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
