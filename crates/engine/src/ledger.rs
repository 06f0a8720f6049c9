//! The Ledger Log.
//!
//! Every completed value movement is appended here as a [`LedgerEntry`]:
//! peer transfers credit another account, purchases credit the store. Rows
//! are never updated or deleted.
//!
//! The receiver is a tagged [`Counterparty`]. In the table it is split into
//! `receiver_kind` (`"account"` or `"store"`) and a nullable `receiver_id`
//! that is set only for accounts, so the store never shares an id space with
//! real users.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, QueryFilter, QueryOrder, entity::prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CounterpartyKind {
    Account,
    Store,
}

impl CounterpartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Store => "store",
        }
    }
}

impl TryFrom<&str> for CounterpartyKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "account" => Ok(Self::Account),
            "store" => Ok(Self::Store),
            other => Err(EngineError::InvalidCounterparty(format!(
                "invalid counterparty kind: {other}"
            ))),
        }
    }
}

/// Who received the coins of a ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Counterparty {
    /// Another user account (peer transfer).
    Account { user_id: i64 },
    /// The store: the coins were spent on a catalog item and left circulation.
    Store,
}

impl Counterparty {
    fn kind(self) -> CounterpartyKind {
        match self {
            Self::Account { .. } => CounterpartyKind::Account,
            Self::Store => CounterpartyKind::Store,
        }
    }

    fn account_id(self) -> Option<i64> {
        match self {
            Self::Account { user_id } => Some(user_id),
            Self::Store => None,
        }
    }
}

/// A completed transfer or purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Sequence number assigned by the store; increases with every append.
    pub id: i64,
    pub sender_id: i64,
    pub receiver: Counterparty,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry not yet appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub sender_id: i64,
    pub receiver: Counterparty,
    pub amount: i64,
}

impl NewLedgerEntry {
    pub fn new(sender_id: i64, receiver: Counterparty, amount: i64) -> ResultEngine<Self> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
        }
        if receiver == (Counterparty::Account { user_id: sender_id }) {
            return Err(EngineError::InvalidTransfer(
                "sender and receiver must differ".to_string(),
            ));
        }
        Ok(Self {
            sender_id,
            receiver,
            amount,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sender_id: i64,
    pub receiver_kind: String,
    pub receiver_id: Option<i64>,
    pub amount: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let receiver = match (
            CounterpartyKind::try_from(model.receiver_kind.as_str())?,
            model.receiver_id,
        ) {
            (CounterpartyKind::Account, Some(user_id)) => Counterparty::Account { user_id },
            (CounterpartyKind::Store, None) => Counterparty::Store,
            (kind, receiver_id) => {
                return Err(EngineError::InvalidCounterparty(format!(
                    "ledger entry {}: kind {} with receiver id {receiver_id:?}",
                    model.id,
                    kind.as_str()
                )));
            }
        };

        Ok(Self {
            id: model.id,
            sender_id: model.sender_id,
            receiver,
            amount: model.amount,
            created_at: model.created_at,
        })
    }
}

/// Append an entry and return it with its assigned sequence number.
pub async fn append<C: ConnectionTrait>(db: &C, entry: NewLedgerEntry) -> ResultEngine<LedgerEntry> {
    let model = ActiveModel {
        id: ActiveValue::NotSet,
        sender_id: ActiveValue::Set(entry.sender_id),
        receiver_kind: ActiveValue::Set(entry.receiver.kind().as_str().to_string()),
        receiver_id: ActiveValue::Set(entry.receiver.account_id()),
        amount: ActiveValue::Set(entry.amount),
        created_at: ActiveValue::Set(Utc::now()),
    }
    .insert(db)
    .await?;
    LedgerEntry::try_from(model)
}

/// Every entry sent by `user_id` or received by its account, in sequence
/// order.
pub async fn list_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> ResultEngine<Vec<LedgerEntry>> {
    let models = Entity::find()
        .filter(
            Condition::any().add(Column::SenderId.eq(user_id)).add(
                Condition::all()
                    .add(Column::ReceiverKind.eq(CounterpartyKind::Account.as_str()))
                    .add(Column::ReceiverId.eq(user_id)),
            ),
        )
        .order_by_asc(Column::Id)
        .all(db)
        .await?;

    models.into_iter().map(LedgerEntry::try_from).collect()
}
