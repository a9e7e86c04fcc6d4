use lesson_core::leveling::LevelProgress;
use lesson_core::model::{AgeGroup, ChildProfile, Lesson, LevelId, SkillMastery};
use services::LessonGroup;

#[derive(Clone, Debug, PartialEq)]
pub struct ChildCardVm {
    pub id: String,
    pub name: String,
    pub initial: String,
    pub grade_label: String,
    pub level_label: String,
    pub xp_label: String,
    pub streak_label: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MasteryRowVm {
    pub skill_id: String,
    pub skill_name: String,
    pub percent_label: String,
    pub bar_style: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LessonRowVm {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LessonGroupVm {
    pub key: String,
    pub title: String,
    pub progress_label: String,
    pub rows: Vec<LessonRowVm>,
}

#[must_use]
pub fn grade_label(age_group: AgeGroup) -> String {
    format!("Grades {}", age_group.as_str())
}

#[must_use]
pub fn map_child_card(child: &ChildProfile) -> ChildCardVm {
    let level = LevelProgress::from_total(u64::from(child.total_points));
    ChildCardVm {
        id: child.id.to_string(),
        name: child.name.clone(),
        initial: child
            .name
            .chars()
            .next()
            .map(|ch| ch.to_uppercase().to_string())
            .unwrap_or_default(),
        grade_label: grade_label(child.age_group),
        level_label: format!("Level {}", level.level),
        xp_label: format!("{} XP", child.total_points),
        streak_label: (child.streak_count > 0).then(|| match child.streak_count {
            1 => "1 day streak".to_string(),
            days => format!("{days} day streak"),
        }),
    }
}

/// Rows with a name first; unnamed skills fall back to their id.
#[must_use]
pub fn map_mastery_rows(rows: &[SkillMastery]) -> Vec<MasteryRowVm> {
    let mut mapped: Vec<MasteryRowVm> = rows
        .iter()
        .map(|row| {
            let level = row.mastery_level.min(100);
            let skill_name = if row.skill_name.trim().is_empty() {
                row.skill_id.to_string()
            } else {
                row.skill_name.clone()
            };
            MasteryRowVm {
                skill_id: row.skill_id.to_string(),
                skill_name,
                percent_label: format!("{level}%"),
                bar_style: format!("width: {level}%;"),
            }
        })
        .collect();
    mapped.sort_by(|a, b| a.skill_name.cmp(&b.skill_name));
    mapped
}

fn lesson_row(lesson: &Lesson, completed: bool) -> LessonRowVm {
    LessonRowVm {
        id: lesson.id.to_string(),
        title: lesson.title.clone(),
        description: lesson.description.clone().filter(|text| !text.trim().is_empty()),
        completed,
    }
}

#[must_use]
pub fn map_lesson_rows(lessons: &[Lesson]) -> Vec<LessonRowVm> {
    lessons.iter().map(|lesson| lesson_row(lesson, false)).collect()
}

/// `level-2` reads as "Level 2"; unplaced lessons get a catch-all title.
#[must_use]
pub fn level_title(level_id: Option<&LevelId>) -> String {
    let Some(level_id) = level_id else {
        return "More Missions".to_string();
    };
    level_id
        .as_str()
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn map_lesson_groups(groups: &[LessonGroup]) -> Vec<LessonGroupVm> {
    groups
        .iter()
        .map(|group| LessonGroupVm {
            key: group
                .level_id
                .as_ref()
                .map_or_else(String::new, ToString::to_string),
            title: level_title(group.level_id.as_ref()),
            progress_label: format!("{}/{} completed", group.completed_count(), group.lessons.len()),
            rows: group
                .lessons
                .iter()
                .map(|status| lesson_row(&status.lesson, status.completed))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use lesson_core::model::{ChildId, FamilyId, LessonId, SkillId};
    use services::LessonStatus;

    use super::*;

    fn child(total_points: u32, streak_count: u32) -> ChildProfile {
        ChildProfile {
            id: ChildId::new("c1"),
            family_id: FamilyId::new("f1"),
            name: "aiko".into(),
            avatar_url: None,
            age_group: AgeGroup::ThirdToFifth,
            streak_count,
            total_points,
            mastery_gating_enabled: false,
        }
    }

    #[test]
    fn child_card_shows_level_and_streak() {
        let card = map_child_card(&child(300, 4));
        assert_eq!(card.initial, "A");
        assert_eq!(card.grade_label, "Grades 3-5");
        assert_eq!(card.level_label, "Level 3");
        assert_eq!(card.xp_label, "300 XP");
        assert_eq!(card.streak_label.as_deref(), Some("4 day streak"));

        assert_eq!(map_child_card(&child(0, 0)).streak_label, None);
    }

    #[test]
    fn mastery_rows_are_sorted_and_clamped() {
        let rows = vec![
            SkillMastery {
                child_id: ChildId::new("c1"),
                skill_id: SkillId::new("s2"),
                skill_name: "Transport".into(),
                mastery_level: 120,
                last_practiced_at: None,
            },
            SkillMastery {
                child_id: ChildId::new("c1"),
                skill_id: SkillId::new("s1"),
                skill_name: "Food".into(),
                mastery_level: 40,
                last_practiced_at: None,
            },
        ];
        let mapped = map_mastery_rows(&rows);
        assert_eq!(mapped[0].skill_name, "Food");
        assert_eq!(mapped[1].percent_label, "100%");
        assert_eq!(mapped[1].bar_style, "width: 100%;");
    }

    #[test]
    fn level_titles_read_like_headings() {
        assert_eq!(level_title(Some(&LevelId::new("level-2"))), "Level 2");
        assert_eq!(level_title(Some(&LevelId::new("east_asia"))), "East Asia");
        assert_eq!(level_title(None), "More Missions");
    }

    #[test]
    fn lesson_groups_count_completed_rows() {
        let status = |id: &str, completed: bool| LessonStatus {
            lesson: Lesson {
                id: LessonId::new(id),
                level_id: Some(LevelId::new("level-1")),
                title: format!("Lesson {id}"),
                description: Some("  ".into()),
                order_index: 0,
            },
            completed,
        };
        let groups = vec![LessonGroup {
            level_id: Some(LevelId::new("level-1")),
            lessons: vec![status("a", true), status("b", false)],
        }];

        let mapped = map_lesson_groups(&groups);
        assert_eq!(mapped[0].title, "Level 1");
        assert_eq!(mapped[0].progress_label, "1/2 completed");
        assert!(mapped[0].rows[0].completed);
        assert_eq!(mapped[0].rows[1].description, None);
    }
}
