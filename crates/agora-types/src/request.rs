//! Action request types submitted to the Chain Builder.
//!
//! One parameter variant per [`ActionKind`], in the same closed-enum shape
//! as step payloads: the builder matches exhaustively, so a kind/parameter
//! mismatch is impossible to persist.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::ActionKind;
use crate::ids::{AgentId, LocationId, LotId};

/// Action-specific parameters submitted alongside an [`ActionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
pub enum ActionParams {
    /// Parameters for [`ActionKind::Delivery`].
    Delivery {
        /// The lot to carry. Must be owned by the requesting agent.
        lot: LotId,
        /// The building to deliver to.
        destination: LocationId,
    },
    /// Parameters for [`ActionKind::Trade`].
    Trade {
        /// The agent to trade with.
        counterparty: AgentId,
        /// The lot the requester sells to the counterparty, or `None` for
        /// a plain payment.
        lot: Option<LotId>,
        /// The price the paying party hands over: the counterparty when a
        /// lot changes hands, the requester otherwise.
        price: Decimal,
    },
    /// Parameters for [`ActionKind::Construction`].
    Construction {
        /// The building site to construct at.
        site: LocationId,
        /// Construction cost debited from the requester.
        cost: Decimal,
        /// Optional hand-over fee owed to the site operator on completion.
        handover_fee: Option<Decimal>,
    },
}

impl ActionParams {
    /// The [`ActionKind`] these parameters belong to.
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Delivery { .. } => ActionKind::Delivery,
            Self::Trade { .. } => ActionKind::Trade,
            Self::Construction { .. } => ActionKind::Construction,
        }
    }
}

/// A multi-step action request submitted by (or on behalf of) an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// The requesting agent.
    pub agent_id: AgentId,
    /// Action-specific parameters.
    pub params: ActionParams,
    /// Real-world submission timestamp.
    pub submitted_at: DateTime<Utc>,
}
