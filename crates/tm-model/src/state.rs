use serde::{Deserialize, Serialize};

/// Lifecycle of one transport connection, owned by the transport driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    Closed,
    Opening,
    Open,
    Failing,
}

/// Lifecycle of the whole ingestion session, owned by the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerState {
    Disconnected,
    Connected,
    Paused,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_roundtrip_through_json() {
        let s = DriverState::Opening;
        let json = serde_json::to_string(&s).unwrap();
        let back: DriverState = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
