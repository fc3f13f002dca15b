/// Admin command handling behind the REST surface.
pub mod admin_service;
/// Game-room snapshot and notification fan-out.
pub mod broadcast_service;
/// Buzzer arbitration against the storage uniqueness constraint.
pub mod buzzer_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Read-only game projections for the public REST surface.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Fifty-fifty lifeline logic, including the deterministic mask.
pub mod lifeline_service;
/// Join flow placing WebSocket connections into rooms.
pub mod session_service;
/// Storage connection supervision with reconnect backoff.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
