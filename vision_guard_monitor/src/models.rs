//! Backend wire types and the downtime reason catalogue

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Machine run state as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MachineState {
    Run,
    Stop,
    AlarmSpark,
    Unknown(String),
}

impl MachineState {
    pub fn is_running(&self) -> bool {
        matches!(self, MachineState::Run)
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineState::Run => write!(f, "RUN"),
            MachineState::Stop => write!(f, "STOP"),
            MachineState::AlarmSpark => write!(f, "ALARM_SPARK"),
            MachineState::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

impl From<&str> for MachineState {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "RUN" | "RUNNING" => MachineState::Run,
            "STOP" | "STOPPED" => MachineState::Stop,
            "ALARM_SPARK" => MachineState::AlarmSpark,
            _ => MachineState::Unknown(s.to_string()),
        }
    }
}

/// `GET /state`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StateResponse {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub current_cycle: Option<u64>,
    #[serde(default)]
    pub today_runtime_sec: u64,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl StateResponse {
    /// The `state` string wins; `is_running` is only a fallback.
    pub fn machine_state(&self) -> MachineState {
        match self.state.as_deref() {
            Some(state) if !state.is_empty() => MachineState::from(state),
            _ if self.is_running => MachineState::Run,
            _ => MachineState::Stop,
        }
    }
}

/// `GET /summary/today` and `GET /summary?date=`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub total_cycles: Option<u64>,
    #[serde(default)]
    pub total_runtime_sec: Option<u64>,
    #[serde(default)]
    pub total_downtime_sec: u64,
    #[serde(default)]
    pub availability: Option<f64>,
}

/// One contiguous downtime episode.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DowntimeLog {
    pub id: i64,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub end_time: Option<DateTime<Utc>>,
    pub downtime_reason: ReasonCode,
    #[serde(default)]
    pub duration_sec: Option<u64>,
    pub date: NaiveDate,
    pub is_active: bool,
}

impl DowntimeLog {
    /// Client-side stand-in for a record the backend has not returned yet.
    ///
    /// The id is the start instant in milliseconds, so it never collides
    /// with the small sequential ids the backend assigns.
    pub fn provisional(reason: ReasonCode, now: DateTime<Utc>) -> Self {
        Self {
            id: now.timestamp_millis(),
            start_time: now,
            end_time: None,
            downtime_reason: reason,
            duration_sec: None,
            date: now.date_naive(),
            is_active: true,
        }
    }

    /// Whole seconds elapsed since the episode started, never negative.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.start_time).num_seconds().max(0) as u64
    }
}

/// `GET /downtime/active`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ActiveDowntimeStatus {
    pub is_active: bool,
    #[serde(default)]
    pub current_downtime: Option<DowntimeLog>,
}

impl ActiveDowntimeStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    /// The active record, if the snapshot is active and carries one.
    ///
    /// A snapshot claiming `is_active` without a record has no start time
    /// to count from, so it reads as idle.
    pub fn active_record(&self) -> Option<&DowntimeLog> {
        if self.is_active {
            self.current_downtime.as_ref()
        } else {
            None
        }
    }
}

/// `POST /downtime/start` body
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StartDowntimeRequest {
    pub downtime_reason: String,
}

/// `GET /cycles?date=`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CycleRecord {
    pub cycle_no: u64,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub stop_time: DateTime<Utc>,
    pub runtime_sec: u64,
}

/// Filter for `GET /downtime/history`
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: u32,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            limit: 100,
        }
    }
}

impl HistoryQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

/// Fixed catalogue of downtime reasons, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DowntimeReason {
    SetupDie,
    Repair,
    Maintenance,
    MaterialShortage,
    PowerFailure,
    QualityCheck,
    WaitingApproval,
    OperatorBreak,
    Other1,
    Other2,
}

impl DowntimeReason {
    pub const ALL: [DowntimeReason; 10] = [
        DowntimeReason::SetupDie,
        DowntimeReason::Repair,
        DowntimeReason::Maintenance,
        DowntimeReason::MaterialShortage,
        DowntimeReason::PowerFailure,
        DowntimeReason::QualityCheck,
        DowntimeReason::WaitingApproval,
        DowntimeReason::OperatorBreak,
        DowntimeReason::Other1,
        DowntimeReason::Other2,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DowntimeReason::SetupDie => "SETUP_DIE",
            DowntimeReason::Repair => "REPAIR",
            DowntimeReason::Maintenance => "MAINTENANCE",
            DowntimeReason::MaterialShortage => "MATERIAL_SHORTAGE",
            DowntimeReason::PowerFailure => "POWER_FAILURE",
            DowntimeReason::QualityCheck => "QUALITY_CHECK",
            DowntimeReason::WaitingApproval => "WAITING_APPROVAL",
            DowntimeReason::OperatorBreak => "OPERATOR_BREAK",
            DowntimeReason::Other1 => "OTHER_1",
            DowntimeReason::Other2 => "OTHER_2",
        }
    }

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            DowntimeReason::SetupDie => "SETUP DIE",
            DowntimeReason::Repair => "เครื่องขัดข้อง/alarm",
            DowntimeReason::Maintenance => "บำรุงรักษา",
            DowntimeReason::MaterialShortage => "รอวัตถุดิบ",
            DowntimeReason::PowerFailure => "ไฟฟ้าขัดข้อง",
            DowntimeReason::QualityCheck => "ตรวจสอบคุณภาพ",
            DowntimeReason::WaitingApproval => "รอการอนุมัติ",
            DowntimeReason::OperatorBreak => "พักผ่อน",
            DowntimeReason::Other1 => "อื่นๆ 1",
            DowntimeReason::Other2 => "อื่นๆ 2",
        }
    }

    /// Presentation colour hint
    pub fn color(&self) -> &'static str {
        match self {
            DowntimeReason::SetupDie => "blue",
            DowntimeReason::Repair => "red",
            DowntimeReason::Maintenance => "yellow",
            DowntimeReason::MaterialShortage => "orange",
            DowntimeReason::PowerFailure => "purple",
            DowntimeReason::QualityCheck => "green",
            DowntimeReason::WaitingApproval => "gray",
            DowntimeReason::OperatorBreak => "cyan",
            DowntimeReason::Other1 | DowntimeReason::Other2 => "slate",
        }
    }
}

impl std::fmt::Display for DowntimeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DowntimeReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        DowntimeReason::ALL
            .into_iter()
            .find(|reason| reason.code() == wanted)
            .ok_or_else(|| format!("unknown downtime reason '{}'", s))
    }
}

/// A reason code as received from the backend.
///
/// Codes outside the catalogue are kept verbatim instead of failing the
/// whole response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReasonCode {
    Known(DowntimeReason),
    Unknown(String),
}

impl ReasonCode {
    pub fn as_str(&self) -> &str {
        match self {
            ReasonCode::Known(reason) => reason.code(),
            ReasonCode::Unknown(raw) => raw,
        }
    }

    /// Display label, or the raw code when it is not in the catalogue.
    pub fn label(&self) -> &str {
        match self {
            ReasonCode::Known(reason) => reason.label(),
            ReasonCode::Unknown(raw) => raw,
        }
    }

    pub fn known(&self) -> Option<DowntimeReason> {
        match self {
            ReasonCode::Known(reason) => Some(*reason),
            ReasonCode::Unknown(_) => None,
        }
    }
}

impl From<DowntimeReason> for ReasonCode {
    fn from(reason: DowntimeReason) -> Self {
        ReasonCode::Known(reason)
    }
}

impl From<String> for ReasonCode {
    fn from(raw: String) -> Self {
        match raw.parse::<DowntimeReason>() {
            Ok(reason) => ReasonCode::Known(reason),
            Err(_) => ReasonCode::Unknown(raw),
        }
    }
}

impl From<ReasonCode> for String {
    fn from(code: ReasonCode) -> Self {
        code.as_str().to_string()
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /downtime/summary/today`: reason code to cumulative seconds.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DowntimeSummary(pub BTreeMap<String, u64>);

impl DowntimeSummary {
    pub fn seconds_for(&self, code: &str) -> u64 {
        self.0.get(code).copied().unwrap_or(0)
    }

    pub fn total_secs(&self) -> u64 {
        self.0.values().sum()
    }

    /// Every catalogue reason in display order (absent ones as zero),
    /// followed by any codes the catalogue does not know.
    pub fn entries(&self) -> Vec<(ReasonCode, u64)> {
        let mut entries: Vec<(ReasonCode, u64)> = DowntimeReason::ALL
            .into_iter()
            .map(|reason| (ReasonCode::Known(reason), self.seconds_for(reason.code())))
            .collect();

        for (code, secs) in &self.0 {
            if code.parse::<DowntimeReason>().is_err() {
                entries.push((ReasonCode::Unknown(code.clone()), *secs));
            }
        }

        entries
    }
}

/// Backend timestamps arrive either as RFC 3339 or as naive ISO-8601
/// local time (no offset).
pub mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }

        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?;

        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    fn invalid<E: serde::de::Error>(raw: &str) -> E {
        E::custom(format!("invalid timestamp '{}'", raw))
    }

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| invalid(&raw))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| super::invalid(&raw)),
                None => Ok(None),
            }
        }
    }
}
