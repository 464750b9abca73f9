//! `SeaORM` active enums backed by PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::TransactionKind;
use tally_core::sponsorship::OrderStatus;

/// `ledger_tx_type` enum, shared by agent and user logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ledger_tx_type")]
#[serde(rename_all = "snake_case")]
pub enum LedgerTxType {
    /// Balance increment.
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Guarded balance decrement.
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Receiving side of a transfer.
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    /// Sending side of a transfer.
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
}

impl From<TransactionKind> for LedgerTxType {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Credit => Self::Credit,
            TransactionKind::Debit => Self::Debit,
            TransactionKind::TransferIn => Self::TransferIn,
            TransactionKind::TransferOut => Self::TransferOut,
        }
    }
}

impl From<LedgerTxType> for TransactionKind {
    fn from(kind: LedgerTxType) -> Self {
        match kind {
            LedgerTxType::Credit => Self::Credit,
            LedgerTxType::Debit => Self::Debit,
            LedgerTxType::TransferIn => Self::TransferIn,
            LedgerTxType::TransferOut => Self::TransferOut,
        }
    }
}

/// `sponsorship_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "sponsorship_status")]
#[serde(rename_all = "lowercase")]
pub enum SponsorshipStatus {
    /// Awaiting confirmation.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Confirmed and credited.
    #[sea_orm(string_value = "rewarded")]
    Rewarded,
}

impl From<SponsorshipStatus> for OrderStatus {
    fn from(status: SponsorshipStatus) -> Self {
        match status {
            SponsorshipStatus::Pending => Self::Pending,
            SponsorshipStatus::Rewarded => Self::Rewarded,
        }
    }
}
