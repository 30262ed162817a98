//! Response envelope shared by every resource endpoint.

use serde::{Deserialize, Serialize};

/// Where the payload of an [`Envelope`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Decoded from a cached value
    Cache,
    /// Freshly fetched from the statistics API and formatted
    Api,
}

/// `{ "source": ..., "data": ... }`
///
/// `data` has the same schema whichever `source` produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub source: Source,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn cache(data: T) -> Self {
        Self {
            source: Source::Cache,
            data,
        }
    }

    pub fn api(data: T) -> Self {
        Self {
            source: Source::Api,
            data,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.source == Source::Cache
    }
}
