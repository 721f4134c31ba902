pub use crate::qdec::QdecExt as _kinetis_qdec_QdecExt;
