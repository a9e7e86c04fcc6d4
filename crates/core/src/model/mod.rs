mod activity;
mod family;
mod ids;

pub use ids::{
    ActivityId, ChildId, FamilyId, LessonId, LevelId, OptionId, ParseIdError, ProfileId, SkillId,
};

pub use activity::{
    Activity, ActivityError, ActivityIssue, ActivityKind, ChoiceOption, Hotspot, WidgetKind,
};
pub use family::{
    AgeGroup, ChildProfile, ChildProfileDraft, ChildProfileError, Family, FamilyResolution,
    Lesson, MAX_CHILD_NAME_LEN, Profile, SkillMastery, ValidatedChildProfile,
    default_family_name,
};
