//! Projection of a rule record into the query and recording options that
//! the catalogue and the recorder consume.
//!
//! Pure mappings. A field is carried iff the rule set it; downstream cannot
//! tell an absent field from an explicit null.

use crate::types::{EncodeOption, Rule, RuleOption, SearchOption};

/// Build the catalogue query for a rule. `week` is always carried.
pub fn search_option(rule: &Rule) -> SearchOption {
    SearchOption {
        week: rule.week,
        keyword: rule.keyword.clone(),
        ignore_keyword: rule.ignore_keyword.clone(),
        key_cs: rule.key_cs,
        key_reg_exp: rule.key_reg_exp,
        title: rule.title,
        description: rule.description,
        extended: rule.extended,
        gr: rule.gr,
        bs: rule.bs,
        cs: rule.cs,
        sky: rule.sky,
        station: rule.station,
        genrelv1: rule.genrelv1,
        genrelv2: rule.genrelv2,
        start_time: rule.start_time,
        time_range: rule.time_range,
        is_free: rule.is_free,
        duration_min: rule.duration_min,
        duration_max: rule.duration_max,
    }
}

/// Build the recording output policy for a rule. `enable` is always carried.
pub fn rule_option(rule: &Rule) -> RuleOption {
    RuleOption {
        enable: rule.enable,
        directory: rule.directory.clone(),
        recorded_format: rule.recorded_format.clone(),
    }
}

/// Build the transcode directive for a rule.
///
/// `None` unless the rule decides what happens to the transport stream
/// (`del_ts`); the mode/directory pairs are carried iff set.
pub fn encode_option(rule: &Rule) -> Option<EncodeOption> {
    let del_ts = rule.del_ts?;
    Some(EncodeOption {
        mode1: rule.mode1,
        directory1: rule.directory1.clone(),
        mode2: rule.mode2,
        directory2: rule.directory2.clone(),
        mode3: rule.mode3,
        directory3: rule.directory3.clone(),
        del_ts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_option_carries_week_and_set_fields() {
        let rule = Rule {
            id: 1,
            enable: true,
            week: 0x41,
            keyword: Some("anime".to_string()),
            gr: Some(true),
            duration_min: Some(600),
            ..Default::default()
        };

        let option = search_option(&rule);
        assert_eq!(option.week, 0x41);
        assert_eq!(option.keyword.as_deref(), Some("anime"));
        assert_eq!(option.gr, Some(true));
        assert_eq!(option.duration_min, Some(600));
        // Unset rule fields stay unset in the query.
        assert_eq!(option.bs, None);
        assert_eq!(option.ignore_keyword, None);
    }

    #[test]
    fn test_rule_option_always_carries_enable() {
        let rule = Rule {
            id: 1,
            enable: false,
            directory: Some("anime".to_string()),
            ..Default::default()
        };

        let option = rule_option(&rule);
        assert!(!option.enable);
        assert_eq!(option.directory.as_deref(), Some("anime"));
        assert_eq!(option.recorded_format, None);
    }

    #[test]
    fn test_encode_option_requires_del_ts() {
        let mut rule = Rule {
            id: 1,
            mode1: Some(0),
            directory1: Some("encoded".to_string()),
            ..Default::default()
        };
        assert_eq!(encode_option(&rule), None);

        rule.del_ts = Some(true);
        let option = encode_option(&rule).unwrap();
        assert!(option.del_ts);
        assert_eq!(option.mode1, Some(0));
        assert_eq!(option.directory1.as_deref(), Some("encoded"));
        assert_eq!(option.mode2, None);
    }
}
