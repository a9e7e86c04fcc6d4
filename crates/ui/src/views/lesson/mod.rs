mod activities;
mod completion;
mod player;
mod practice;

pub use player::LessonView;
pub use practice::{PracticeView, SkillPracticeView};

#[cfg(test)]
pub(crate) use player::PlayerTestHandles;
