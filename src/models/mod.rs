//! Domain records and the request/response shapes of the HTTP API

pub mod chatbot;
pub mod common;
pub mod mission;
pub mod points;
pub mod review;
pub mod reward;
pub mod store;
pub mod user;

pub use chatbot::{ChatMessage, ChatRole};
pub use common::{MessageResponse, Page, PageParams};
pub use mission::{Mission, MissionPhoto, MissionType, UserMission, UserMissionStatus};
pub use points::{PointBalance, PointTransaction, TransactionSource, TransactionType};
pub use review::{EntityType, HelpfulMark, Review, ReviewReply, ReviewSort};
pub use reward::{DutyFreeReceipt, RewardClaim, RewardTier};
pub use store::{PartnerStore, StoreCategory};
pub use user::{AuthProvider, Role, User};
