//! Data model for the reservation planner.
//!
//! These types mirror the persisted reservation document: camelCase field
//! names, optional fields omitted when absent, unknown fields tolerated on
//! read for forward compatibility.

use serde::{Deserialize, Serialize};

/// Program identifier assigned by the catalogue.
pub type ProgramId = i64;

/// Rule identifier assigned by the rule store.
pub type RuleId = i64;

/// Epoch milliseconds.
pub type UnixMillis = i64;

/// Broadcast channel classification.
///
/// - GR: digital terrestrial (地上波)
/// - BS: BS satellite
/// - CS: 110-degree CS satellite
/// - SKY: 124/128-degree CS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    GR,
    BS,
    CS,
    SKY,
}

/// A broadcast event with a fixed interval and channel type.
///
/// Planning only reads `id`, the `[start_at, end_at)` interval and
/// `channel_type`; the descriptive fields round-trip through the document
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    pub channel_id: i64,
    /// Start of the broadcast (inclusive), epoch milliseconds.
    pub start_at: UnixMillis,
    /// End of the broadcast (exclusive), epoch milliseconds.
    pub end_at: UnixMillis,
    pub channel_type: ChannelType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre1: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre2: Option<i32>,
    #[serde(default)]
    pub is_free: bool,
}

impl Program {
    /// Half-open interval overlap test. A program ending exactly when
    /// another starts does not overlap it.
    pub fn overlaps(&self, other: &Program) -> bool {
        self.start_at < other.end_at && other.start_at < self.end_at
    }
}

/// One unit of planning: a program the user wants recorded.
///
/// Exactly one of `manual_id` / `rule_id` is set; the constructors are the
/// only way to build one, so the invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Program snapshot captured at planning time.
    pub program: Program,
    /// Present iff the user requested this program directly. Also the
    /// manual tie-break: smaller means reserved earlier, higher priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_id: Option<i64>,
    /// Present iff a matching rule produced this reservation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_option: Option<RuleOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encode_option: Option<EncodeOption>,
    /// User override: keep the record but do not record the program.
    #[serde(default)]
    pub is_skip: bool,
    /// Derived by the resolver: no tuner could host this program.
    #[serde(default)]
    pub is_conflict: bool,
}

impl Reservation {
    /// Create a manual reservation pinned to one program.
    pub fn manual(program: Program, manual_id: i64, encode_option: Option<EncodeOption>) -> Self {
        Self {
            program,
            manual_id: Some(manual_id),
            rule_id: None,
            rule_option: None,
            encode_option,
            is_skip: false,
            is_conflict: false,
        }
    }

    /// Create a reservation produced by a rule match.
    pub fn from_rule(
        program: Program,
        rule_id: RuleId,
        rule_option: RuleOption,
        encode_option: Option<EncodeOption>,
    ) -> Self {
        Self {
            program,
            manual_id: None,
            rule_id: Some(rule_id),
            rule_option: Some(rule_option),
            encode_option,
            is_skip: false,
            is_conflict: false,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.manual_id.is_some()
    }

    pub fn is_rule(&self) -> bool {
        self.rule_id.is_some()
    }
}

/// Per-rule recording output policy, passed through to the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOption {
    pub enable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_format: Option<String>,
}

/// Transcode directive, passed through to the encoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode1: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode2: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode3: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory3: Option<String>,
    /// Whether to delete the raw transport stream after transcoding.
    #[serde(default)]
    pub del_ts: bool,
}

/// Catalogue query derived from a rule.
///
/// `week` is a weekday bitmask (bit 0 = Sunday) and is always present.
/// Every other field is carried from the rule iff the rule set it; the
/// catalogue cannot tell an absent field from an explicit null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOption {
    pub week: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_keyword: Option<String>,
    /// Case-sensitive keyword matching.
    #[serde(rename = "keyCS", skip_serializing_if = "Option::is_none")]
    pub key_cs: Option<bool>,
    /// Treat the keyword as a regular expression.
    #[serde(rename = "keyRegExp", skip_serializing_if = "Option::is_none")]
    pub key_reg_exp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended: Option<bool>,
    #[serde(rename = "GR", skip_serializing_if = "Option::is_none")]
    pub gr: Option<bool>,
    #[serde(rename = "BS", skip_serializing_if = "Option::is_none")]
    pub bs: Option<bool>,
    #[serde(rename = "CS", skip_serializing_if = "Option::is_none")]
    pub cs: Option<bool>,
    #[serde(rename = "SKY", skip_serializing_if = "Option::is_none")]
    pub sky: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genrelv1: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genrelv2: Option<i32>,
    /// Start hour of the accepted time window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u32>,
    /// Width of the accepted time window in hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_free: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_max: Option<u32>,
}

/// A user-defined matching rule as stored by the rule store.
///
/// The planner reads `id`, `enable` and the projection source fields; the
/// projections in [`crate::rule`] turn the rest into the query and
/// recording options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub week: u8,
    pub keyword: Option<String>,
    pub ignore_keyword: Option<String>,
    #[serde(rename = "keyCS")]
    pub key_cs: Option<bool>,
    #[serde(rename = "keyRegExp")]
    pub key_reg_exp: Option<bool>,
    pub title: Option<bool>,
    pub description: Option<bool>,
    pub extended: Option<bool>,
    #[serde(rename = "GR")]
    pub gr: Option<bool>,
    #[serde(rename = "BS")]
    pub bs: Option<bool>,
    #[serde(rename = "CS")]
    pub cs: Option<bool>,
    #[serde(rename = "SKY")]
    pub sky: Option<bool>,
    pub station: Option<i64>,
    pub genrelv1: Option<i32>,
    pub genrelv2: Option<i32>,
    pub start_time: Option<u32>,
    pub time_range: Option<u32>,
    pub is_free: Option<bool>,
    pub duration_min: Option<u32>,
    pub duration_max: Option<u32>,
    // Recording output policy
    pub directory: Option<String>,
    pub recorded_format: Option<String>,
    // Transcode directive
    pub mode1: Option<i32>,
    pub directory1: Option<String>,
    pub mode2: Option<i32>,
    pub directory2: Option<String>,
    pub mode3: Option<i32>,
    pub directory3: Option<String>,
    pub del_ts: Option<bool>,
}

/// Immutable descriptor of one physical tuner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunerDevice {
    pub index: u32,
    /// Channel types this tuner can receive.
    pub types: Vec<ChannelType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(id: ProgramId, start_at: UnixMillis, end_at: UnixMillis) -> Program {
        Program {
            id,
            channel_id: 1,
            start_at,
            end_at,
            channel_type: ChannelType::GR,
            name: format!("program {}", id),
            description: None,
            extended: None,
            genre1: None,
            genre2: None,
            is_free: true,
        }
    }

    #[test]
    fn test_overlaps_half_open() {
        let a = program(1, 100, 200);
        let b = program(2, 200, 300);
        let c = program(3, 150, 250);

        // Adjacent intervals do not overlap.
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));

        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_reservation_origin_constructors() {
        let manual = Reservation::manual(program(1, 100, 200), 42, None);
        assert!(manual.is_manual());
        assert!(!manual.is_rule());

        let rule = Reservation::from_rule(
            program(2, 100, 200),
            7,
            RuleOption {
                enable: true,
                directory: None,
                recorded_format: None,
            },
            None,
        );
        assert!(rule.is_rule());
        assert!(!rule.is_manual());
    }

    #[test]
    fn test_document_field_names() {
        let reservation = Reservation::manual(program(1, 100, 200), 42, None);
        let json = serde_json::to_value(&reservation).unwrap();

        assert_eq!(json["manualId"], 42);
        assert_eq!(json["program"]["startAt"], 100);
        assert_eq!(json["program"]["channelType"], "GR");
        assert_eq!(json["isSkip"], false);
        // Absent options are omitted entirely.
        assert!(json.get("ruleId").is_none());
        assert!(json.get("encodeOption").is_none());
    }

    #[test]
    fn test_document_tolerates_unknown_fields() {
        let json = r#"{
            "program": {
                "id": 1, "channelId": 1, "startAt": 100, "endAt": 200,
                "channelType": "BS", "name": "news", "futureField": 1
            },
            "manualId": 42,
            "somethingNew": {"nested": true}
        }"#;
        let reservation: Reservation = serde_json::from_str(json).unwrap();
        assert_eq!(reservation.program.id, 1);
        assert_eq!(reservation.manual_id, Some(42));
        // Flags absent from an old document default to false.
        assert!(!reservation.is_skip);
        assert!(!reservation.is_conflict);
    }

    #[test]
    fn test_search_option_channel_flag_names() {
        let option = SearchOption {
            week: 0x7f,
            gr: Some(true),
            key_cs: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["week"], 0x7f);
        assert_eq!(json["GR"], true);
        assert_eq!(json["keyCS"], false);
        assert!(json.get("BS").is_none());
    }
}
