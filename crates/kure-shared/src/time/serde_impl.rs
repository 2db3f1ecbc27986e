use serde::{Deserialize, Serialize, de::Visitor};

use crate::time::Duration;

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a human-readable duration like 30s, 5m or 1h30m")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse::<Duration>().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(DurationVisitor)
    }
}

impl Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Reconcile {
        interval: Duration,
    }

    #[test]
    fn deserialize() {
        let reconcile: Reconcile =
            serde_yaml::from_str("interval: 1h30m").expect("duration must deserialize");
        assert_eq!(reconcile.interval.as_secs(), 5400);
    }

    #[test]
    fn deserialize_invalid() {
        serde_yaml::from_str::<Reconcile>("interval: 5 m").expect_err("duration must not parse");
    }

    #[test]
    fn serialize() {
        let reconcile = Reconcile {
            interval: Duration::from_secs(90),
        };
        assert_eq!(
            serde_yaml::to_string(&reconcile).expect("duration must serialize"),
            "interval: 1m30s\n"
        );
    }
}
