#![deny(missing_docs)]
#![doc = "Core keys, error taxonomy and dataset paths shared by the mela lattice correlator analysis."]

pub mod errors;
pub mod keys;
pub mod path;
pub mod provenance;
pub mod rng;

pub use errors::{ErrorInfo, MelaError};
pub use keys::{
    Channel, Displacement, Insertion, Momentum, OperatorPair, RatioKey, SeriesKey, ThreePointKey,
    TwoPointKey,
};
pub use path::DatasetPath;
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, substream_id, EnsembleRng};
