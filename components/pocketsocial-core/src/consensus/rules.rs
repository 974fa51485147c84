const DAY: i64 = 24 * 3600;

/// Rule families with their own checkpoint schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Reputation,
    BlockingCancel,
}

/// Numeric limits defined by reputation rules. Exposed by name so callers
/// outside the reputation path (notably the feed filter) can read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusLimit {
    ThresholdReputationScore,
    ThresholdLikersCount,
    ScoresOneToOne,
    ScoresOneToOneOverComment,
    ScoresOneToOneDepth,
    ScoresToPostModifyReputationDepth,
    BadReputation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusPolicy {
    PostScoreAddress,
}

/// Which address a post score counts against in the threshold and rate-limit
/// checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScoreAddressPolicy {
    /// Historical behavior: the content author's address, unless the score
    /// participates in the lottery.
    ContentAuthorUnlessLottery,
    /// The rater's address, always.
    AlwaysRater,
}

/// One reputation checkpoint. Every field is fully specified; a checkpoint
/// repeats the values it does not change.
#[derive(Debug, Clone)]
pub struct ReputationRule {
    pub activation_height: u64,
    pub threshold_reputation_score: i64,
    pub threshold_likers_count: i64,
    pub scores_one_to_one: i64,
    pub scores_one_to_one_over_comment: i64,
    pub scores_one_to_one_depth: i64,
    pub scores_to_post_modify_reputation_depth: i64,
    pub bad_reputation: i64,
    pub post_score_address: PostScoreAddressPolicy,
}

/// Blocking-cancel checkpoints carry no limits yet; the schedule exists so
/// future policy can activate by height.
#[derive(Debug, Clone)]
pub struct BlockingCancelRule {
    pub activation_height: u64,
}

/// The immutable rule tables, constructed once at process start and passed
/// into consensus calls by the host. Construction fails if any kind lacks a
/// height-0 rule, which keeps rule selection a total function of height.
#[derive(Debug, Clone)]
pub struct ConsensusRules {
    reputation: Vec<ReputationRule>,
    blocking_cancel: Vec<BlockingCancelRule>,
}

impl ConsensusRules {
    pub fn mainnet() -> Result<ConsensusRules, String> {
        let rules = ConsensusRules {
            reputation: mainnet_reputation_checkpoints(),
            blocking_cancel: mainnet_blocking_cancel_checkpoints(),
        };
        rules.self_check()?;
        Ok(rules)
    }

    fn self_check(&self) -> Result<(), String> {
        check_schedule(
            "Reputation",
            self.reputation.iter().map(|r| r.activation_height),
        )?;
        check_schedule(
            "BlockingCancel",
            self.blocking_cancel.iter().map(|r| r.activation_height),
        )?;
        Ok(())
    }

    /// The reputation rule active at `height`: the record with the largest
    /// `activation_height <= height`.
    pub fn active_reputation(&self, height: u64) -> &ReputationRule {
        let next = self
            .reputation
            .partition_point(|rule| rule.activation_height <= height);
        &self.reputation[next - 1]
    }

    pub fn active_blocking_cancel(&self, height: u64) -> &BlockingCancelRule {
        let next = self
            .blocking_cancel
            .partition_point(|rule| rule.activation_height <= height);
        &self.blocking_cancel[next - 1]
    }

    pub fn get_limit(
        &self,
        kind: RuleKind,
        limit: ConsensusLimit,
        height: u64,
    ) -> Result<i64, String> {
        match kind {
            RuleKind::Reputation => {
                let rule = self.active_reputation(height);
                Ok(match limit {
                    ConsensusLimit::ThresholdReputationScore => rule.threshold_reputation_score,
                    ConsensusLimit::ThresholdLikersCount => rule.threshold_likers_count,
                    ConsensusLimit::ScoresOneToOne => rule.scores_one_to_one,
                    ConsensusLimit::ScoresOneToOneOverComment => {
                        rule.scores_one_to_one_over_comment
                    }
                    ConsensusLimit::ScoresOneToOneDepth => rule.scores_one_to_one_depth,
                    ConsensusLimit::ScoresToPostModifyReputationDepth => {
                        rule.scores_to_post_modify_reputation_depth
                    }
                    ConsensusLimit::BadReputation => rule.bad_reputation,
                })
            }
            RuleKind::BlockingCancel => Err(format!(
                "limit {:?} is not defined for {:?} rules",
                limit, kind
            )),
        }
    }

    pub fn get_policy(
        &self,
        kind: RuleKind,
        policy: ConsensusPolicy,
        height: u64,
    ) -> Result<PostScoreAddressPolicy, String> {
        match (kind, policy) {
            (RuleKind::Reputation, ConsensusPolicy::PostScoreAddress) => {
                Ok(self.active_reputation(height).post_score_address)
            }
            (kind, policy) => Err(format!(
                "policy {:?} is not defined for {:?} rules",
                policy, kind
            )),
        }
    }
}

fn check_schedule(kind: &str, heights: impl Iterator<Item = u64>) -> Result<(), String> {
    let mut previous: Option<u64> = None;
    for height in heights {
        match previous {
            None => {
                if height != 0 {
                    return Err(format!("{} rules are missing the height-0 record", kind));
                }
            }
            Some(previous) => {
                if height <= previous {
                    return Err(format!(
                        "{} rules are not strictly ordered at height {}",
                        kind, height
                    ));
                }
            }
        }
        previous = Some(height);
    }
    if previous.is_none() {
        return Err(format!("{} rules are empty", kind));
    }
    Ok(())
}

// Checkpoints are appended as data, ordered by activation height. The last
// one shipped under the "1124000" label but activated at 889524.
fn mainnet_reputation_checkpoints() -> Vec<ReputationRule> {
    vec![
        ReputationRule {
            activation_height: 0,
            threshold_reputation_score: -10000,
            threshold_likers_count: 0,
            scores_one_to_one: 99999,
            scores_one_to_one_over_comment: 20,
            scores_one_to_one_depth: 336 * DAY,
            scores_to_post_modify_reputation_depth: 336 * DAY,
            bad_reputation: -500,
            post_score_address: PostScoreAddressPolicy::ContentAuthorUnlessLottery,
        },
        ReputationRule {
            activation_height: 108300,
            threshold_reputation_score: 500,
            threshold_likers_count: 0,
            scores_one_to_one: 99999,
            scores_one_to_one_over_comment: 20,
            scores_one_to_one_depth: 336 * DAY,
            scores_to_post_modify_reputation_depth: 336 * DAY,
            bad_reputation: -500,
            post_score_address: PostScoreAddressPolicy::ContentAuthorUnlessLottery,
        },
        ReputationRule {
            activation_height: 151600,
            threshold_reputation_score: 500,
            threshold_likers_count: 0,
            scores_one_to_one: 99999,
            scores_one_to_one_over_comment: 20,
            scores_one_to_one_depth: 336 * DAY,
            scores_to_post_modify_reputation_depth: 336 * DAY,
            bad_reputation: -500,
            post_score_address: PostScoreAddressPolicy::AlwaysRater,
        },
        ReputationRule {
            activation_height: 225000,
            threshold_reputation_score: 500,
            threshold_likers_count: 0,
            scores_one_to_one: 2,
            scores_one_to_one_over_comment: 20,
            scores_one_to_one_depth: DAY,
            scores_to_post_modify_reputation_depth: 336 * DAY,
            bad_reputation: -500,
            post_score_address: PostScoreAddressPolicy::AlwaysRater,
        },
        ReputationRule {
            activation_height: 292800,
            threshold_reputation_score: 1000,
            threshold_likers_count: 0,
            scores_one_to_one: 2,
            scores_one_to_one_over_comment: 20,
            scores_one_to_one_depth: 7 * DAY,
            scores_to_post_modify_reputation_depth: 336 * DAY,
            bad_reputation: -500,
            post_score_address: PostScoreAddressPolicy::AlwaysRater,
        },
        ReputationRule {
            activation_height: 322700,
            threshold_reputation_score: 1000,
            threshold_likers_count: 0,
            scores_one_to_one: 2,
            scores_one_to_one_over_comment: 20,
            scores_one_to_one_depth: 2 * DAY,
            scores_to_post_modify_reputation_depth: 30 * DAY,
            bad_reputation: -500,
            post_score_address: PostScoreAddressPolicy::AlwaysRater,
        },
        ReputationRule {
            activation_height: 889524,
            threshold_reputation_score: 1000,
            threshold_likers_count: 100,
            scores_one_to_one: 2,
            scores_one_to_one_over_comment: 20,
            scores_one_to_one_depth: 2 * DAY,
            scores_to_post_modify_reputation_depth: 30 * DAY,
            bad_reputation: -500,
            post_score_address: PostScoreAddressPolicy::AlwaysRater,
        },
    ]
}

fn mainnet_blocking_cancel_checkpoints() -> Vec<BlockingCancelRule> {
    vec![
        BlockingCancelRule {
            activation_height: 0,
        },
        BlockingCancelRule {
            activation_height: 1,
        },
    ]
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::{
        check_schedule, ConsensusLimit, ConsensusPolicy, ConsensusRules, PostScoreAddressPolicy,
        RuleKind,
    };

    #[test_case(0 => -10000)]
    #[test_case(108299 => -10000; "just below the first checkpoint")]
    #[test_case(108300 => 500; "exactly at the first checkpoint")]
    #[test_case(292799 => 500)]
    #[test_case(292800 => 1000)]
    #[test_case(10_000_000 => 1000; "far above every checkpoint")]
    fn selects_threshold_reputation_score(height: u64) -> i64 {
        let rules = ConsensusRules::mainnet().unwrap();
        rules.active_reputation(height).threshold_reputation_score
    }

    #[test]
    fn heights_above_all_checkpoints_resolve_to_the_last_one() {
        let rules = ConsensusRules::mainnet().unwrap();
        let top = rules.active_reputation(10_000_000);
        assert_eq!(top.activation_height, 889524);
        assert_eq!(top.threshold_likers_count, 100);
    }

    #[test]
    fn selection_is_monotonic_in_height() {
        let rules = ConsensusRules::mainnet().unwrap();
        let heights = [
            0, 1, 108299, 108300, 151599, 151600, 225000, 292800, 322699, 322700, 889523, 889524,
            2_000_000,
        ];
        for pair in heights.windows(2) {
            let below = rules.active_reputation(pair[0]).activation_height;
            let above = rules.active_reputation(pair[1]).activation_height;
            assert!(below <= above);
        }
    }

    #[test]
    fn blocking_cancel_schedule_resolves() {
        let rules = ConsensusRules::mainnet().unwrap();
        assert_eq!(rules.active_blocking_cancel(0).activation_height, 0);
        assert_eq!(rules.active_blocking_cancel(1).activation_height, 1);
        assert_eq!(rules.active_blocking_cancel(500_000).activation_height, 1);
    }

    #[test]
    fn exposes_limits_and_policies_by_name() {
        let rules = ConsensusRules::mainnet().unwrap();
        assert_eq!(
            rules.get_limit(RuleKind::Reputation, ConsensusLimit::BadReputation, 0),
            Ok(-500)
        );
        assert_eq!(
            rules.get_limit(
                RuleKind::Reputation,
                ConsensusLimit::ScoresOneToOneDepth,
                322700
            ),
            Ok(2 * 24 * 3600)
        );
        assert_eq!(
            rules.get_policy(RuleKind::Reputation, ConsensusPolicy::PostScoreAddress, 151599),
            Ok(PostScoreAddressPolicy::ContentAuthorUnlessLottery)
        );
        assert_eq!(
            rules.get_policy(RuleKind::Reputation, ConsensusPolicy::PostScoreAddress, 151600),
            Ok(PostScoreAddressPolicy::AlwaysRater)
        );
        assert!(rules
            .get_limit(
                RuleKind::BlockingCancel,
                ConsensusLimit::ThresholdReputationScore,
                0
            )
            .is_err());
    }

    #[test]
    fn schedule_check_requires_height_zero_and_strict_order() {
        assert!(check_schedule("Test", [0u64, 10, 20].into_iter()).is_ok());
        assert!(check_schedule("Test", [10u64, 20].into_iter()).is_err());
        assert!(check_schedule("Test", [0u64, 20, 20].into_iter()).is_err());
        assert!(check_schedule("Test", std::iter::empty()).is_err());
    }
}
