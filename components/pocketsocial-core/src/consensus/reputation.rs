use pocketnet_types::{ScoreData, SocialTransaction, TxKind};

use crate::db::ratings::RatingsReader;
use crate::try_debug;
use crate::utils::Context;

use super::rules::{ConsensusRules, PostScoreAddressPolicy, ReputationRule};

const POST_SCORE_VALUES: [i64; 5] = [1, 2, 3, 4, 5];
const POST_SCORE_LOTTERY_VALUES: [i64; 2] = [4, 5];
const COMMENT_SCORE_VALUES: [i64; 2] = [-1, 1];
const COMMENT_SCORE_LOTTERY_VALUES: [i64; 1] = [1];

/// Decides whether score transactions may modify their target's reputation.
/// Every decision is a pure function of the score data, the transaction under
/// validation, the height, the lottery flag and the ratings snapshot strictly
/// below that height. Any failed or empty ratings lookup denies the
/// modification.
pub struct ReputationConsensus<'a> {
    rules: &'a ConsensusRules,
    ratings: &'a dyn RatingsReader,
}

impl<'a> ReputationConsensus<'a> {
    pub fn new(rules: &'a ConsensusRules, ratings: &'a dyn RatingsReader) -> Self {
        ReputationConsensus { rules, ratings }
    }

    pub fn allow_modify_reputation(
        &self,
        score: &ScoreData,
        tx: &SocialTransaction,
        height: u64,
        lottery: bool,
        ctx: &Context,
    ) -> bool {
        match score.score_type {
            TxKind::ActionScorePost => self.allow_over_post(score, tx, height, lottery, ctx),
            TxKind::ActionScoreComment => self.allow_over_comment(score, tx, height, lottery, ctx),
            _ => false,
        }
    }

    fn allow_over_post(
        &self,
        score: &ScoreData,
        tx: &SocialTransaction,
        height: u64,
        lottery: bool,
        ctx: &Context,
    ) -> bool {
        let rule = self.rules.active_reputation(height);
        let (counted_address_id, counted_address_hash) =
            select_address_for_post_score(rule, score, lottery);

        if !self.allow_modify_reputation_of(counted_address_id, height, rule) {
            try_debug!(
                ctx,
                "Post score {} rejected: address {} below thresholds at height {}",
                tx.txid,
                counted_address_hash,
                height
            );
            return false;
        }

        let values: &[i64] = if lottery {
            &POST_SCORE_LOTTERY_VALUES
        } else {
            &POST_SCORE_VALUES
        };
        let count = match self.ratings.score_content_count(
            TxKind::ActionScorePost,
            counted_address_hash,
            &score.content_address_hash,
            height,
            tx.txid.get_hash_bytes_str(),
            tx.time,
            values,
            rule.scores_one_to_one_depth,
        ) {
            Ok(Some(count)) => count,
            Ok(None) | Err(_) => {
                try_debug!(ctx, "Post score {} rejected: count unavailable", tx.txid);
                return false;
            }
        };
        if count >= rule.scores_one_to_one {
            try_debug!(
                ctx,
                "Post score {} rejected: {} prior scores ({} -> {}) within window",
                tx.txid,
                count,
                counted_address_hash,
                score.content_address_hash
            );
            return false;
        }

        true
    }

    fn allow_over_comment(
        &self,
        score: &ScoreData,
        tx: &SocialTransaction,
        height: u64,
        lottery: bool,
        ctx: &Context,
    ) -> bool {
        let rule = self.rules.active_reputation(height);

        if !self.allow_modify_reputation_of(score.score_address_id, height, rule) {
            try_debug!(
                ctx,
                "Comment score {} rejected: address {} below thresholds at height {}",
                tx.txid,
                score.score_address_hash,
                height
            );
            return false;
        }

        let values: &[i64] = if lottery {
            &COMMENT_SCORE_LOTTERY_VALUES
        } else {
            &COMMENT_SCORE_VALUES
        };
        let count = match self.ratings.score_content_count(
            TxKind::ActionScoreComment,
            &score.score_address_hash,
            &score.content_address_hash,
            height,
            tx.txid.get_hash_bytes_str(),
            tx.time,
            values,
            rule.scores_one_to_one_depth,
        ) {
            Ok(Some(count)) => count,
            Ok(None) | Err(_) => {
                try_debug!(ctx, "Comment score {} rejected: count unavailable", tx.txid);
                return false;
            }
        };
        if count >= rule.scores_one_to_one_over_comment {
            try_debug!(
                ctx,
                "Comment score {} rejected: {} prior scores ({} -> {}) within window",
                tx.txid,
                count,
                score.score_address_hash,
                score.content_address_hash
            );
            return false;
        }

        true
    }

    /// Both thresholds must hold for the counted address. A missing
    /// reputation or likers row denies, as does a store failure.
    fn allow_modify_reputation_of(
        &self,
        address_id: i64,
        height: u64,
        rule: &ReputationRule,
    ) -> bool {
        let reputation = match self.ratings.user_reputation(address_id, height) {
            Ok(Some(reputation)) => reputation,
            Ok(None) | Err(_) => return false,
        };
        if reputation < rule.threshold_reputation_score {
            return false;
        }

        let likers = match self.ratings.user_likers_count(address_id, height) {
            Ok(Some(likers)) => likers,
            Ok(None) | Err(_) => return false,
        };
        likers >= rule.threshold_likers_count
    }

    /// Scores land on old posts without limit of age, but only recent posts
    /// can still have their author's reputation moved. Other content kinds
    /// are unrestricted for now.
    pub fn allow_modify_old_posts(
        &self,
        score_time: i64,
        content_time: i64,
        content_kind: TxKind,
        height: u64,
    ) -> bool {
        if content_kind == TxKind::ContentPost {
            let rule = self.rules.active_reputation(height);
            return score_time - content_time < rule.scores_to_post_modify_reputation_depth;
        }
        true
    }
}

fn select_address_for_post_score<'s>(
    rule: &ReputationRule,
    score: &'s ScoreData,
    lottery: bool,
) -> (i64, &'s str) {
    match rule.post_score_address {
        PostScoreAddressPolicy::AlwaysRater => (score.score_address_id, &score.score_address_hash),
        PostScoreAddressPolicy::ContentAuthorUnlessLottery => {
            if lottery {
                (score.score_address_id, &score.score_address_hash)
            } else {
                (score.content_address_id, &score.content_address_hash)
            }
        }
    }
}
