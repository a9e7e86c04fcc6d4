use std::sync::Arc;

use lesson_core::engine::{LessonOutcome, POINTS_PER_CORRECT};
use lesson_core::leveling::{self, Difficulty, LevelProgress};
use lesson_core::model::{Activity, ChildId, Lesson, LessonId, SkillId};
use storage::repository::{
    ActivityRepository, CompletionRecord, CompletionRepository, LessonRepository,
    MasteryRepository, StorageError,
};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::error::LessonServiceError;
use crate::lesson_plan::{LessonPlan, SessionNonce, build_lesson_plan, build_practice_plan};

/// Skills a practice session draws from when none is picked.
pub const PRACTICE_SKILL_COUNT: usize = 3;

/// What the completion screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSummary {
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub xp_earned: u32,
    pub total_xp: u64,
    pub level: LevelProgress,
    pub stars: u8,
    /// False when the backend could not record the run.
    pub synced: bool,
}

impl CompletionSummary {
    #[must_use]
    pub fn is_perfect(&self) -> bool {
        leveling::is_perfect(self.score, self.total_questions)
    }
}

/// A practice run and the skills it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeSession {
    pub skills: Vec<SkillId>,
    pub plan: LessonPlan,
}

/// Loads lessons, plans runs and records completions.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    activities: Arc<dyn ActivityRepository>,
    mastery: Arc<dyn MasteryRepository>,
    completions: Arc<dyn CompletionRepository>,
}

impl LessonService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonRepository>,
        activities: Arc<dyn ActivityRepository>,
        mastery: Arc<dyn MasteryRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            clock,
            lessons,
            activities,
            mastery,
            completions,
        }
    }

    /// # Errors
    ///
    /// Returns `LessonServiceError::LessonNotFound` for an unknown id, or
    /// `LessonServiceError::Storage` if the lookup fails.
    pub async fn load_lesson(&self, lesson_id: &LessonId) -> Result<Lesson, LessonServiceError> {
        self.lessons
            .get_lesson(lesson_id)
            .await?
            .ok_or_else(|| LessonServiceError::LessonNotFound(lesson_id.clone()))
    }

    /// Activities of a lesson in `order_index` order. A failed fetch is
    /// logged and yields an empty list.
    pub async fn load_activities(&self, lesson_id: &LessonId) -> Vec<Activity> {
        match self.activities.list_activities(lesson_id).await {
            Ok(activities) => activities,
            Err(err) => {
                warn!(lesson_id = %lesson_id, error = %err, "failed to load activities");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn new_nonce(&self) -> SessionNonce {
        SessionNonce::generate(&self.clock, &mut rand::rng())
    }

    #[must_use]
    pub fn plan(
        &self,
        activities: &[Activity],
        difficulty: Difficulty,
        nonce: &SessionNonce,
    ) -> LessonPlan {
        build_lesson_plan(activities, difficulty, nonce)
    }

    /// Records the run and grants XP.
    ///
    /// The score is capped at ten points per planned question and a perfect
    /// run doubles the XP. When the backend refuses, the failure is logged
    /// and the summary comes back with `synced == false` and the run's own
    /// XP as the total.
    pub async fn complete_lesson(
        &self,
        child_id: &ChildId,
        lesson_id: &LessonId,
        difficulty: Difficulty,
        question_count: u32,
        outcome: &LessonOutcome,
    ) -> CompletionSummary {
        let score = leveling::capped_score(outcome.score, question_count);
        let xp_earned = leveling::xp_reward(difficulty, score, question_count);
        let correct_count = correct_from_score(score);

        let record = CompletionRecord {
            child_id: child_id.clone(),
            lesson_id: lesson_id.clone(),
            completed_at: self.clock.now(),
            score,
            xp_earned,
        };

        let (total_xp, synced) = match self.persist(&record).await {
            Ok(total) => {
                info!(child_id = %child_id, lesson_id = %lesson_id, score, xp_earned, total, "lesson completed");
                (total, true)
            }
            Err(err) => {
                warn!(child_id = %child_id, lesson_id = %lesson_id, error = %err, "failed to record completion");
                (u64::from(xp_earned), false)
            }
        };

        CompletionSummary {
            score,
            correct_count,
            total_questions: question_count,
            xp_earned,
            total_xp,
            level: LevelProgress::from_total(total_xp),
            stars: leveling::star_rating(correct_count, question_count),
            synced,
        }
    }

    /// Skills to practice: the picked one, else the child's three weakest,
    /// else the first skills that have lessons.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if mastery or skill links cannot be read.
    pub async fn practice_skills(
        &self,
        child_id: &ChildId,
        skill_id: Option<&SkillId>,
    ) -> Result<Vec<SkillId>, LessonServiceError> {
        if let Some(skill_id) = skill_id {
            return Ok(vec![skill_id.clone()]);
        }

        let mut mastery = self.mastery.list_mastery(child_id).await?;
        if mastery.is_empty() {
            return Ok(self.lessons.linked_skills(PRACTICE_SKILL_COUNT).await?);
        }
        mastery.sort_by(|a, b| {
            a.mastery_level
                .cmp(&b.mastery_level)
                .then_with(|| a.skill_id.cmp(&b.skill_id))
        });
        Ok(mastery
            .into_iter()
            .take(PRACTICE_SKILL_COUNT)
            .map(|row| row.skill_id)
            .collect())
    }

    /// Plans a practice run over every lesson tagged with the chosen skills.
    /// Lessons whose activities fail to load are skipped.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if skills or skill links cannot be read.
    pub async fn practice_plan(
        &self,
        child_id: &ChildId,
        skill_id: Option<&SkillId>,
        nonce: &SessionNonce,
    ) -> Result<PracticeSession, LessonServiceError> {
        let skills = self.practice_skills(child_id, skill_id).await?;
        let lesson_ids = self.lessons.lessons_for_skills(&skills).await?;

        let mut pool = Vec::new();
        for lesson_id in &lesson_ids {
            pool.extend(self.load_activities(lesson_id).await);
        }
        let plan = build_practice_plan(&pool, nonce);
        debug!(
            child_id = %child_id,
            skills = skills.len(),
            lessons = lesson_ids.len(),
            questions = plan.question_count,
            "planned practice"
        );

        Ok(PracticeSession { skills, plan })
    }

    /// Grants the flat practice XP. Practice runs leave no completion row.
    /// A refused grant is logged and comes back with `synced == false`.
    pub async fn complete_practice(
        &self,
        child_id: &ChildId,
        question_count: u32,
        outcome: &LessonOutcome,
    ) -> CompletionSummary {
        let score = leveling::capped_score(outcome.score, question_count);
        let correct_count = correct_from_score(score);
        let xp_earned = leveling::PRACTICE_XP;

        let (total_xp, synced) = match self.completions.grant_xp(child_id, xp_earned).await {
            Ok(total) => {
                info!(child_id = %child_id, score, xp_earned, total, "practice completed");
                (total, true)
            }
            Err(err) => {
                warn!(child_id = %child_id, error = %err, "failed to grant practice xp");
                (u64::from(xp_earned), false)
            }
        };

        CompletionSummary {
            score,
            correct_count,
            total_questions: question_count,
            xp_earned,
            total_xp,
            level: LevelProgress::from_total(total_xp),
            stars: leveling::star_rating(correct_count, question_count),
            synced,
        }
    }

    async fn persist(&self, record: &CompletionRecord) -> Result<u64, StorageError> {
        self.completions.record_completion(record).await?;
        self.completions
            .grant_xp(&record.child_id, record.xp_earned)
            .await
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn correct_from_score(score: u32) -> u32 {
    (f64::from(score) / f64::from(POINTS_PER_CORRECT)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{
        ActivityKind, AgeGroup, ChildProfileDraft, ChoiceOption, FamilyId, SkillMastery,
    };
    use lesson_core::time::fixed_clock;
    use storage::repository::ChildRepository;
    use storage::repository::{InMemoryRepository, Storage};

    fn service(repo: &InMemoryRepository) -> LessonService {
        let storage = Storage::from_in_memory(repo.clone());
        LessonService::new(
            fixed_clock(),
            storage.lessons,
            storage.activities,
            storage.mastery,
            storage.completions,
        )
    }

    fn outcome(score: u32) -> LessonOutcome {
        LessonOutcome {
            score,
            correct_count: score / 10,
            wrong_ids: Vec::new(),
            total_questions: 2,
        }
    }

    #[tokio::test]
    async fn unknown_child_degrades_to_unsynced_summary() {
        let repo = InMemoryRepository::new();
        let summary = service(&repo)
            .complete_lesson(
                &ChildId::new("ghost"),
                &LessonId::new("l1"),
                Difficulty::Easy,
                2,
                &outcome(20),
            )
            .await;

        assert!(!summary.synced);
        assert_eq!(summary.xp_earned, 200);
        assert_eq!(summary.total_xp, 200);
        assert!(summary.is_perfect());
    }

    #[tokio::test]
    async fn missing_lesson_is_an_error_but_activities_degrade() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        assert!(matches!(
            svc.load_lesson(&LessonId::new("nope")).await,
            Err(LessonServiceError::LessonNotFound(_))
        ));
        assert!(svc.load_activities(&LessonId::new("nope")).await.is_empty());
    }

    #[tokio::test]
    async fn plan_uses_loaded_activities() {
        let repo = InMemoryRepository::new();
        let lesson = LessonId::new("l1");
        let question = Activity::question(
            "q1",
            ActivityKind::MultipleChoice,
            "Pick",
            vec![ChoiceOption::new("1", "A", true)],
        )
        .with_lesson(lesson.clone());
        repo.upsert_activity(&question).await.unwrap();

        let svc = service(&repo);
        let activities = svc.load_activities(&lesson).await;
        let plan = svc.plan(&activities, Difficulty::Easy, &svc.new_nonce());
        assert_eq!(plan.question_count, 1);
    }

    fn mastery(child: &ChildId, skill: &str, level: u8) -> SkillMastery {
        SkillMastery {
            child_id: child.clone(),
            skill_id: SkillId::new(skill),
            skill_name: skill.to_string(),
            mastery_level: level,
            last_practiced_at: None,
        }
    }

    #[tokio::test]
    async fn practice_targets_the_three_weakest_skills() {
        let repo = InMemoryRepository::new();
        let child = ChildId::new("c1");
        for (skill, level) in [("maps", 90), ("food", 20), ("trains", 55), ("greetings", 20), ("money", 40)] {
            repo.insert_mastery(mastery(&child, skill, level)).unwrap();
        }
        repo.insert_mastery(mastery(&ChildId::new("c2"), "art", 0)).unwrap();

        let svc = service(&repo);
        let skills = svc.practice_skills(&child, None).await.unwrap();
        assert_eq!(
            skills,
            vec![SkillId::new("food"), SkillId::new("greetings"), SkillId::new("money")]
        );

        let picked = SkillId::new("maps");
        assert_eq!(svc.practice_skills(&child, Some(&picked)).await.unwrap(), vec![picked]);
    }

    #[tokio::test]
    async fn practice_without_mastery_falls_back_to_linked_skills() {
        let repo = InMemoryRepository::new();
        for (lesson, skill) in [("l1", "trains"), ("l2", "food"), ("l3", "maps"), ("l4", "art")] {
            repo.link_skill(&LessonId::new(lesson), &SkillId::new(skill)).await.unwrap();
        }
        let skills = service(&repo).practice_skills(&ChildId::new("new"), None).await.unwrap();
        assert_eq!(
            skills,
            vec![SkillId::new("art"), SkillId::new("food"), SkillId::new("maps")]
        );
    }

    #[tokio::test]
    async fn practice_plan_draws_from_linked_lessons_only() {
        let repo = InMemoryRepository::new();
        let child = ChildId::new("c1");
        repo.insert_mastery(mastery(&child, "food", 10)).unwrap();
        repo.link_skill(&LessonId::new("sushi"), &SkillId::new("food")).await.unwrap();
        repo.link_skill(&LessonId::new("rail"), &SkillId::new("trains")).await.unwrap();
        for (id, lesson) in [("q-sushi", "sushi"), ("q-rail", "rail")] {
            let activity = Activity::question(
                id,
                ActivityKind::MultipleChoice,
                format!("About {lesson}"),
                vec![ChoiceOption::new("1", "A", true)],
            )
            .with_lesson(LessonId::new(lesson));
            repo.upsert_activity(&activity).await.unwrap();
        }

        let session = service(&repo)
            .practice_plan(&child, None, &SessionNonce::new("n"))
            .await
            .unwrap();
        assert_eq!(session.skills, vec![SkillId::new("food")]);
        let ids: Vec<&str> = session.plan.activities.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["q-sushi"]);
        assert_eq!(session.plan.question_count, 1);
    }

    #[tokio::test]
    async fn practice_grants_flat_xp_without_a_completion_row() {
        let repo = InMemoryRepository::new();
        let draft = ChildProfileDraft::new(FamilyId::new("f"), "Mika", Some(AgeGroup::ThirdToFifth));
        let child = repo.insert_child(draft.validate().unwrap()).await.unwrap();

        let summary = service(&repo).complete_practice(&child.id, 2, &outcome(20)).await;
        assert!(summary.synced);
        assert_eq!(summary.xp_earned, 50);
        assert_eq!(summary.total_xp, 50);
        assert_eq!(summary.correct_count, 2);
        assert_eq!(summary.stars, 3);
        assert!(repo.completions().unwrap().is_empty());

        let offline = service(&repo)
            .complete_practice(&ChildId::new("ghost"), 2, &outcome(5))
            .await;
        assert!(!offline.synced);
        assert_eq!(offline.total_xp, 50);
    }
}
