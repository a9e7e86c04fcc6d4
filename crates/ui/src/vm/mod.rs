mod admin_vm;
mod dashboard_vm;
mod markdown_vm;
mod player_vm;

pub use admin_vm::{
    ActivityForm, ActivityRowVm, EDITABLE_KINDS, format_option_lines, map_activity_rows,
    parse_option_lines,
};
pub use dashboard_vm::{
    ChildCardVm, LessonGroupVm, LessonRowVm, MasteryRowVm, grade_label, level_title,
    map_child_card, map_lesson_groups, map_lesson_rows, map_mastery_rows,
};
pub use markdown_vm::{markdown_to_html, sanitize_html, speech_text, strip_html_tags};
pub use player_vm::{
    CompletionVm, PlayerIntent, choice_key_from_char, completion_vm, difficulty_card_label,
    option_class, option_shortcut, pin_style, practice_completion_vm, progress_style, step_label,
};
