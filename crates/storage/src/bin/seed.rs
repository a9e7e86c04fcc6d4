use std::fmt;

use lesson_core::model::{
    Activity, ActivityKind, AgeGroup, ChildProfileDraft, ChoiceOption, Hotspot, Lesson, LessonId,
    LevelId, ProfileId, SkillId, default_family_name,
};
use lesson_core::Clock;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    lesson_id: LessonId,
    lesson_title: String,
    skill_id: SkillId,
    user_id: ProfileId,
    email: Option<String>,
    child_name: Option<String>,
    age_group: AgeGroup,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLessonId { raw: String },
    InvalidAgeGroup { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --lesson-id value: {raw}"),
            ArgsError::InvalidAgeGroup { raw } => {
                write!(f, "invalid --age-group value (K-2, 3-5, 6-8, 9-12): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("TRIPLEARN_DB_URL").unwrap_or_else(|_| "sqlite:triplearn.sqlite3".into());
        let mut lesson_id = std::env::var("TRIPLEARN_LESSON_ID")
            .ok()
            .and_then(|value| value.parse::<LessonId>().ok())
            .unwrap_or_else(|| LessonId::new("japan-basics"));
        let mut lesson_title = "Japan Basics".to_string();
        let mut skill_id = SkillId::new("greetings");
        let mut user_id = std::env::var("TRIPLEARN_USER_ID")
            .ok()
            .and_then(|value| value.parse::<ProfileId>().ok())
            .unwrap_or_else(|| ProfileId::new("local-parent"));
        let mut email = std::env::var("TRIPLEARN_EMAIL").ok();
        let mut child_name = std::env::var("TRIPLEARN_CHILD_NAME").ok();
        let mut age_group = AgeGroup::ThirdToFifth;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--lesson-id" => {
                    let value = require_value(&mut args, "--lesson-id")?;
                    lesson_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLessonId { raw: value.clone() })?;
                }
                "--lesson-title" => {
                    lesson_title = require_value(&mut args, "--lesson-title")?;
                }
                "--skill" => {
                    skill_id = SkillId::new(require_value(&mut args, "--skill")?);
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user_id = ProfileId::new(value);
                }
                "--email" => {
                    email = Some(require_value(&mut args, "--email")?);
                }
                "--child" => {
                    child_name = Some(require_value(&mut args, "--child")?);
                }
                "--age-group" => {
                    let value = require_value(&mut args, "--age-group")?;
                    age_group = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidAgeGroup { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            lesson_id,
            lesson_title,
            skill_id,
            user_id,
            email,
            child_name,
            age_group,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:triplearn.sqlite3)");
    eprintln!("  --lesson-id <id>          Lesson id to upsert (default: japan-basics)");
    eprintln!("  --lesson-title <title>    Lesson title (default: Japan Basics)");
    eprintln!("  --skill <id>              Skill the lesson practices (default: greetings)");
    eprintln!("  --user <id>               Parent profile id (default: local-parent)");
    eprintln!("  --email <email>           Parent email, used for the family name");
    eprintln!("  --child <name>            Also create a child profile with this name");
    eprintln!("  --age-group <group>       Child age group (default: 3-5)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  TRIPLEARN_DB_URL, TRIPLEARN_LESSON_ID, TRIPLEARN_USER_ID, TRIPLEARN_EMAIL, TRIPLEARN_CHILD_NAME"
    );
}

fn sample_activities(lesson_id: &LessonId) -> Vec<Activity> {
    let activities = vec![
        Activity::info(
            format!("{lesson_id}-intro"),
            "Konnichiwa!",
            "Japan is a country made of **thousands of islands**. People greet each other with a small bow.",
        ),
        Activity::question(
            format!("{lesson_id}-greeting"),
            ActivityKind::MultipleChoice,
            "How do you say hello in Japanese?",
            vec![
                ChoiceOption::new("1", "Konnichiwa (kon-nee-chee-wah)", true)
                    .with_explanation("Konnichiwa is the everyday daytime greeting."),
                ChoiceOption::new("2", "Sayonara (sah-yoh-nah-rah)", false)
                    .with_explanation("Sayonara means goodbye."),
                ChoiceOption::new("3", "Arigato (ah-ree-gah-toh)", false)
                    .with_explanation("Arigato means thank you."),
            ],
        ),
        Activity::question(
            format!("{lesson_id}-capital"),
            ActivityKind::MapClick,
            "Tap the capital city of Japan.",
            vec![
                ChoiceOption::new("1", "Tokyo", true)
                    .with_hotspot(Hotspot::new(62.0, 48.0)),
                ChoiceOption::new("2", "Osaka", false)
                    .with_hotspot(Hotspot::new(48.0, 58.0)),
                ChoiceOption::new("3", "Sapporo", false)
                    .with_hotspot(Hotspot::new(70.0, 15.0)),
            ],
        ),
        Activity::question(
            format!("{lesson_id}-train"),
            ActivityKind::Flashcard,
            "Put the fastest train on top.",
            vec![
                ChoiceOption::new("1", "Local bus", false),
                ChoiceOption::new("2", "Shinkansen (shin-kahn-sen)", true),
                ChoiceOption::new("3", "Bicycle", false),
            ],
        ),
        Activity::question(
            format!("{lesson_id}-manners"),
            ActivityKind::Scenario,
            "You walk into a home in Japan. What do you do first?",
            vec![
                ChoiceOption::new("1", "Take off your shoes", true)
                    .with_explanation("Shoes stay in the genkan (gen-kahn), the entry area."),
                ChoiceOption::new("2", "Keep your shoes on", false),
            ],
        ),
    ];

    activities
        .into_iter()
        .enumerate()
        .map(|(index, activity)| {
            activity
                .with_lesson(lesson_id.clone())
                .with_order_index(i32::try_from(index).unwrap_or(i32::MAX))
        })
        .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url, Clock::default()).await?;

    storage
        .lessons
        .upsert_lesson(&Lesson {
            id: args.lesson_id.clone(),
            level_id: Some(LevelId::new("level-1")),
            title: args.lesson_title.clone(),
            description: Some("Greetings, cities and manners.".into()),
            order_index: 0,
        })
        .await?;
    storage
        .lessons
        .link_skill(&args.lesson_id, &args.skill_id)
        .await?;

    let activities = sample_activities(&args.lesson_id);
    for activity in &activities {
        activity.validate()?;
        storage.activities.upsert_activity(activity).await?;
    }

    let resolution = storage
        .families
        .resolve_family(
            &args.user_id,
            args.email.as_deref(),
            &default_family_name(args.email.as_deref()),
        )
        .await?;

    if let Some(name) = args.child_name.as_deref() {
        let draft = ChildProfileDraft::new(resolution.family_id.clone(), name, Some(args.age_group));
        let child = storage.children.insert_child(draft.validate()?).await?;
        println!("Created child {} ({})", child.name, child.id);
    }

    println!(
        "Seeded lesson {} with {} activities for family {} into {}",
        args.lesson_id,
        activities.len(),
        resolution.family_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
