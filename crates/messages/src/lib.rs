//! Messages exchanged with and between chains.
//!
//! - [`Call`] / [`Extrinsic`]: what clients submit to a chain.
//! - [`Xcm`]: programs one chain sends another.
//! - [`Datagram`]: responses to state-read requests.
//! - [`FinalizedHeader`]: state roots relayed between chains.

mod call;
mod extrinsic;
mod header;
mod ismp;
mod xcm;

pub use call::{
    AssetRateCall, AssetRegistryCall, BalancesCall, BrokerCall, Call, IsmpCall, OrdersCall,
    ProcessorCall, RegionsCall, SudoCall, SystemCall, TokensCall, UtilityCall, XcmCall,
};
pub use extrinsic::{Extrinsic, SignedExtra, SubmitOptions};
pub use header::FinalizedHeader;
pub use ismp::{Datagram, ResponseMessage, StateProof};
pub use xcm::{AssetClass, Fungibility, Instruction, MultiAsset, Xcm, XcmEnvelope};
