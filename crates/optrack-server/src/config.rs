use std::time::Duration;

use optrack_vision::HsvRange;

use crate::error::{config_error, ServerResult};

/// Which detector implementation the session pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorBackend {
    /// HTTP detection microservice.
    Remote,
    /// Scripted detector, for demos and tests.
    Stub,
}

/// Which placement classifier the session pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementBackend {
    /// HSV mask corner sampling, fully local.
    Mask,
    /// Vision-language model classification.
    Semantic,
}

/// Server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HTTP endpoint that serves the current camera frame as JPEG.
    pub frame_source_url: String,
    /// Frames fetched per second from the source.
    pub frame_rate: u32,
    pub detector_backend: DetectorBackend,
    pub placement_backend: PlacementBackend,
    /// Window length for consensus and report publication.
    pub report_interval: Duration,
    /// Accumulation length for clip artifacts.
    pub clip_interval: Duration,
    /// Minimum confidence for detections entering the pipeline.
    pub confidence_threshold: f32,
    /// Consecutive frame failures before the session aborts.
    pub max_consecutive_failures: u32,
    /// HSV range of the instrument table covering, for mask placement.
    pub mask_range: HsvRange,
    pub session_id: String,
}

impl ServerConfig {
    pub fn from_env() -> ServerResult<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env_parse("PORT", 8000u16);

        let frame_source_url = std::env::var("FRAME_SOURCE_URL")
            .unwrap_or_else(|_| "http://localhost:8080/frame".to_string());
        let frame_rate = env_parse("FRAME_RATE", 10u32).max(1);

        let detector_backend = match std::env::var("DETECTOR_BACKEND").as_deref() {
            Ok("stub") => DetectorBackend::Stub,
            Ok("remote") | Err(_) => DetectorBackend::Remote,
            Ok(other) => {
                return Err(config_error(format!("Unknown detector backend: {other}")))
            }
        };

        let placement_backend = match std::env::var("PLACEMENT_BACKEND").as_deref() {
            Ok("semantic") => PlacementBackend::Semantic,
            Ok("mask") | Err(_) => PlacementBackend::Mask,
            Ok(other) => {
                return Err(config_error(format!("Unknown placement backend: {other}")))
            }
        };

        let report_interval = Duration::from_secs_f64(env_parse("REPORT_INTERVAL_SECS", 4.0f64));
        let clip_interval = Duration::from_secs_f64(env_parse("CLIP_INTERVAL_SECS", 5.0f64));

        let confidence_threshold = env_parse("CONFIDENCE_THRESHOLD", 0.4f32).clamp(0.0, 1.0);
        let max_consecutive_failures = env_parse("MAX_CONSECUTIVE_FAILURES", 3u32).max(1);

        let mask_range = match (
            std::env::var("MASK_HSV_LOWER").ok(),
            std::env::var("MASK_HSV_UPPER").ok(),
        ) {
            (Some(lower), Some(upper)) => HsvRange {
                lower: parse_hsv(&lower)?,
                upper: parse_hsv(&upper)?,
            },
            _ => HsvRange::blue_cloth(),
        };

        let session_id = std::env::var("SESSION_ID")
            .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

        Ok(Self {
            host,
            port,
            frame_source_url,
            frame_rate,
            detector_backend,
            placement_backend,
            report_interval,
            clip_interval,
            confidence_threshold,
            max_consecutive_failures,
            mask_range,
            session_id,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parses an HSV triple like "100,80,50" into OpenCV-scaled components.
fn parse_hsv(raw: &str) -> ServerResult<[u8; 3]> {
    let parts: Vec<u8> = raw
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| config_error(format!("Invalid HSV triple: {raw}")))?;
    if parts.len() != 3 {
        return Err(config_error(format!("Invalid HSV triple: {raw}")));
    }
    Ok([parts[0], parts[1], parts[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hsv_valid() {
        assert_eq!(parse_hsv("100, 80,50").unwrap(), [100, 80, 50]);
    }

    #[test]
    fn test_parse_hsv_rejects_short_and_garbage() {
        assert!(parse_hsv("100,80").is_err());
        assert!(parse_hsv("blue").is_err());
        assert!(parse_hsv("100,80,50,1").is_err());
    }

    #[test]
    fn test_bind_address() {
        let mut config = ServerConfig::from_env().unwrap();
        config.host = "127.0.0.1".to_string();
        config.port = 9000;
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }
}
