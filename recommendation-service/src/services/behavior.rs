//! Behavior aggregation
//!
//! Folds a user's raw activity into weighted category scores:
//! +3 per document authored (credited to its type and its faculties),
//! +2 per active conversation membership (faculties and tags),
//! +1 per "useful" review and -1 per "not useful" review (credited
//! like authored documents). Non-positive aggregates are dropped.

use crate::models::{ScoreItem, UserActivity, UserBehaviorData};
use std::collections::HashMap;
use uuid::Uuid;

pub const DOCUMENT_CREATED_SCORE: i64 = 3;
pub const CONVERSATION_JOINED_SCORE: i64 = 2;
pub const USEFUL_VOTE_SCORE: i64 = 1;
pub const NOT_USEFUL_VOTE_SCORE: i64 = -1;

/// Insertion-ordered score accumulator
#[derive(Default)]
struct ScoreMap {
    order: Vec<Uuid>,
    scores: HashMap<Uuid, i64>,
}

impl ScoreMap {
    fn add(&mut self, id: Uuid, score: i64) {
        match self.scores.entry(id) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                *e.get_mut() += score;
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(score);
                self.order.push(id);
            }
        }
    }

    /// Drain positive aggregates in first-contribution order
    fn into_positive(self) -> Vec<ScoreItem> {
        self.order
            .into_iter()
            .filter_map(|id| {
                let score = self.scores[&id];
                (score > 0).then_some(ScoreItem { id, score })
            })
            .collect()
    }
}

/// Fold raw activity into per-category scores
pub fn aggregate(activity: &UserActivity) -> UserBehaviorData {
    let mut faculties = ScoreMap::default();
    let mut types = ScoreMap::default();
    let mut tags = ScoreMap::default();

    for doc in &activity.documents {
        if let Some(type_id) = doc.type_id {
            types.add(type_id, DOCUMENT_CREATED_SCORE);
        }
        for faculty_id in &doc.faculty_ids {
            faculties.add(*faculty_id, DOCUMENT_CREATED_SCORE);
        }
    }

    for membership in &activity.memberships {
        for faculty_id in &membership.faculty_ids {
            faculties.add(*faculty_id, CONVERSATION_JOINED_SCORE);
        }
        for tag_id in &membership.tag_ids {
            tags.add(*tag_id, CONVERSATION_JOINED_SCORE);
        }
    }

    for review in &activity.reviews {
        let score = if review.useful {
            USEFUL_VOTE_SCORE
        } else {
            NOT_USEFUL_VOTE_SCORE
        };
        if let Some(type_id) = review.type_id {
            types.add(type_id, score);
        }
        for faculty_id in &review.faculty_ids {
            faculties.add(*faculty_id, score);
        }
    }

    UserBehaviorData {
        faculty_scores: faculties.into_positive(),
        type_scores: types.into_positive(),
        tag_scores: tags.into_positive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthoredDocument, CastReview, JoinedConversation};

    #[test]
    fn test_no_activity_yields_empty_scores() {
        let behavior = aggregate(&UserActivity::default());
        assert!(behavior.is_empty());
    }

    #[test]
    fn test_document_credits_type_and_faculties() {
        let type_id = Uuid::new_v4();
        let faculty_a = Uuid::new_v4();
        let faculty_b = Uuid::new_v4();

        let activity = UserActivity {
            documents: vec![AuthoredDocument {
                document_id: Uuid::new_v4(),
                type_id: Some(type_id),
                faculty_ids: vec![faculty_a, faculty_b],
            }],
            ..Default::default()
        };

        let behavior = aggregate(&activity);
        assert_eq!(
            behavior.type_scores,
            vec![ScoreItem {
                id: type_id,
                score: 3
            }]
        );
        assert_eq!(behavior.faculty_scores.len(), 2);
        assert!(behavior.faculty_scores.iter().all(|s| s.score == 3));
        assert!(behavior.tag_scores.is_empty());
    }

    #[test]
    fn test_membership_credits_faculties_and_tags() {
        let faculty = Uuid::new_v4();
        let tag = Uuid::new_v4();

        let activity = UserActivity {
            memberships: vec![JoinedConversation {
                conversation_id: Uuid::new_v4(),
                faculty_ids: vec![faculty],
                tag_ids: vec![tag],
            }],
            ..Default::default()
        };

        let behavior = aggregate(&activity);
        assert_eq!(
            behavior.faculty_scores,
            vec![ScoreItem {
                id: faculty,
                score: 2
            }]
        );
        assert_eq!(behavior.tag_scores, vec![ScoreItem { id: tag, score: 2 }]);
    }

    #[test]
    fn test_lone_negative_review_is_filtered_out() {
        let type_id = Uuid::new_v4();

        let activity = UserActivity {
            reviews: vec![CastReview {
                document_id: Uuid::new_v4(),
                useful: false,
                type_id: Some(type_id),
                faculty_ids: vec![Uuid::new_v4()],
            }],
            ..Default::default()
        };

        let behavior = aggregate(&activity);
        // -1 aggregates are dropped, not reported as negative entries
        assert!(behavior.type_scores.is_empty());
        assert!(behavior.faculty_scores.is_empty());
    }

    #[test]
    fn test_negative_review_offsets_authored_document() {
        let type_id = Uuid::new_v4();

        let activity = UserActivity {
            documents: vec![AuthoredDocument {
                document_id: Uuid::new_v4(),
                type_id: Some(type_id),
                faculty_ids: vec![],
            }],
            reviews: vec![CastReview {
                document_id: Uuid::new_v4(),
                useful: false,
                type_id: Some(type_id),
                faculty_ids: vec![],
            }],
            ..Default::default()
        };

        let behavior = aggregate(&activity);
        assert_eq!(
            behavior.type_scores,
            vec![ScoreItem {
                id: type_id,
                score: 2
            }]
        );
    }

    #[test]
    fn test_scores_keep_first_contribution_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let activity = UserActivity {
            memberships: vec![
                JoinedConversation {
                    conversation_id: Uuid::new_v4(),
                    faculty_ids: vec![first],
                    tag_ids: vec![],
                },
                JoinedConversation {
                    conversation_id: Uuid::new_v4(),
                    faculty_ids: vec![second, first],
                    tag_ids: vec![],
                },
            ],
            ..Default::default()
        };

        let behavior = aggregate(&activity);
        assert_eq!(behavior.faculty_scores[0].id, first);
        assert_eq!(behavior.faculty_scores[0].score, 4);
        assert_eq!(behavior.faculty_scores[1].id, second);
    }
}
