//! Data Transfer Objects
//!
//! Response types for the API endpoints.
//! Request bodies are schema-free telemetry and parsed in the broadcast module.

use serde::Serialize;

// ============================================
// INGEST DTOs
// ============================================

/// Successful ingest response
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Status: "success"
    pub status: String,
    /// Human-readable confirmation
    pub message: String,
}

impl IngestResponse {
    pub fn received() -> Self {
        Self {
            status: "success".to_string(),
            message: "Data received".to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "draining"
    pub status: String,
    /// Currently registered subscriptions
    pub subscribers: usize,
    /// Events published since start
    pub published: u64,
    /// Subscriptions evicted for overflowing their buffer
    pub evicted: u64,
    pub uptime_seconds: u64,
    /// RFC 3339 start time
    pub started_at: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_response_serialize() {
        let json = serde_json::to_string(&IngestResponse::received()).unwrap();
        assert_eq!(json, r#"{"status":"success","message":"Data received"}"#);
    }
}
