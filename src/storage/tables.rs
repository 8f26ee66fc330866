//! In-memory tables holding every record kind

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    DutyFreeReceipt, HelpfulMark, Mission, PartnerStore, PointBalance, PointTransaction, Review,
    ReviewReply, RewardClaim, User, UserMission,
};

/// Primary key of a stored record
pub trait Keyed {
    fn key_id(&self) -> Uuid;
}

macro_rules! keyed_by {
    ($($ty:ty => $field:ident),+ $(,)?) => {
        $(
            impl Keyed for $ty {
                fn key_id(&self) -> Uuid {
                    self.$field
                }
            }
        )+
    };
}

keyed_by! {
    User => id,
    PointBalance => user_id,
    PointTransaction => id,
    PartnerStore => id,
    Mission => id,
    UserMission => id,
    Review => id,
    ReviewReply => id,
    HelpfulMark => id,
    DutyFreeReceipt => id,
    RewardClaim => id,
}

macro_rules! record_tables {
    ($($variant:ident => $field:ident : $ty:ty),+ $(,)?) => {
        /// Any storable record
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub enum Record {
            $($variant($ty)),+
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum RecordKey {
            $($variant(Uuid)),+
        }

        $(
            impl From<$ty> for Record {
                fn from(record: $ty) -> Self {
                    Record::$variant(record)
                }
            }
        )+

        impl Record {
            pub fn key(&self) -> RecordKey {
                match self {
                    $(Record::$variant(record) => RecordKey::$variant(record.key_id())),+
                }
            }
        }

        #[derive(Debug, Default, Clone, Serialize, Deserialize)]
        pub struct Tables {
            $(pub $field: HashMap<Uuid, $ty>,)+
            #[serde(skip)]
            email_index: HashMap<String, Uuid>,
            #[serde(skip)]
            customer_index: HashMap<String, Uuid>,
        }

        impl Tables {
            pub fn get(&self, key: RecordKey) -> Option<Record> {
                match key {
                    $(RecordKey::$variant(id) => self.$field.get(&id).cloned().map(Record::$variant)),+
                }
            }

            fn insert_raw(&mut self, record: Record) -> Option<Record> {
                match record {
                    $(Record::$variant(record) => {
                        let id = record.key_id();
                        self.$field.insert(id, record).map(Record::$variant)
                    }),+
                }
            }

            fn remove_raw(&mut self, key: RecordKey) -> Option<Record> {
                match key {
                    $(RecordKey::$variant(id) => self.$field.remove(&id).map(Record::$variant)),+
                }
            }

            pub fn record_count(&self) -> usize {
                0 $(+ self.$field.len())+
            }
        }
    };
}

record_tables! {
    User => users: User,
    Balance => balances: PointBalance,
    Transaction => transactions: PointTransaction,
    Store => stores: PartnerStore,
    Mission => missions: Mission,
    UserMission => user_missions: UserMission,
    Review => reviews: Review,
    Reply => replies: ReviewReply,
    Helpful => helpful: HelpfulMark,
    Receipt => receipts: DutyFreeReceipt,
    Claim => claims: RewardClaim,
}

impl Tables {
    /// Inserts or replaces a record, keeping the user indexes in step.
    /// Returns the previous value.
    pub(crate) fn put(&mut self, record: Record) -> Option<Record> {
        let user_keys = match &record {
            Record::User(user) => Some((user.email.clone(), user.customer_id.clone(), user.id)),
            _ => None,
        };

        let previous = self.insert_raw(record);
        if let Some(Record::User(old)) = &previous {
            self.email_index.remove(&old.email);
            self.customer_index.remove(&old.customer_id);
        }
        if let Some((email, customer_id, id)) = user_keys {
            self.email_index.insert(email, id);
            self.customer_index.insert(customer_id, id);
        }
        previous
    }

    pub(crate) fn delete(&mut self, key: RecordKey) -> Option<Record> {
        let removed = self.remove_raw(key);
        if let Some(Record::User(old)) = &removed {
            self.email_index.remove(&old.email);
            self.customer_index.remove(&old.customer_id);
        }
        removed
    }

    pub(crate) fn rebuild_indexes(&mut self) {
        self.email_index = self
            .users
            .values()
            .map(|user| (user.email.clone(), user.id))
            .collect();
        self.customer_index = self
            .users
            .values()
            .map(|user| (user.customer_id.clone(), user.id))
            .collect();
    }

    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.email_index
            .get(email)
            .and_then(|id| self.users.get(id))
    }

    pub fn user_by_customer_id(&self, customer_id: &str) -> Option<&User> {
        self.customer_index
            .get(customer_id)
            .and_then(|id| self.users.get(id))
    }

    pub fn customer_id_taken(&self, customer_id: &str) -> bool {
        self.customer_index.contains_key(customer_id)
    }

    pub fn balance_of(&self, user_id: Uuid) -> i64 {
        self.balances
            .get(&user_id)
            .map(|balance| balance.balance)
            .unwrap_or(0)
    }
}
