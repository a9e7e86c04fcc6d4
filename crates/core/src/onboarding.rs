/// Preference key of the "tutorial seen" flag.
pub const ONBOARDING_FLAG_KEY: &str = "triplearn_onboarding_done";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnboardingStep {
    pub emoji: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub const ONBOARDING_STEPS: [OnboardingStep; 4] = [
    OnboardingStep {
        emoji: "🇯🇵",
        title: "Welcome to TripLearn!",
        description: "Get ready to learn amazing things about Japan before your big trip!",
    },
    OnboardingStep {
        emoji: "🎮",
        title: "Play Missions",
        description: "Pick a topic like Food, Transport, or Nature — then answer fun questions to earn XP and stars!",
    },
    OnboardingStep {
        emoji: "🏆",
        title: "Level Up & Earn Rewards",
        description: "The more you play, the more XP you earn. Level up and collect badges!",
    },
    OnboardingStep {
        emoji: "🔥",
        title: "Keep Your Streak!",
        description: "Play a little every day to grow your streak. Missed a question? Read the tip, then replay the mission or practice that skill!",
    },
];

/// What a button press did to the tutorial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingProgress {
    Step(usize),
    /// The caller persists the flag.
    Completed,
}

/// Tutorial overlay state. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OnboardingFlow {
    step: usize,
    done: bool,
}

impl OnboardingFlow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn step_index(&self) -> usize {
        self.step
    }

    #[must_use]
    pub fn current(&self) -> Option<&'static OnboardingStep> {
        if self.done {
            None
        } else {
            ONBOARDING_STEPS.get(self.step)
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.step + 1 == ONBOARDING_STEPS.len()
    }

    pub fn next(&mut self) -> OnboardingProgress {
        if self.done || self.is_last() {
            self.done = true;
            return OnboardingProgress::Completed;
        }
        self.step += 1;
        OnboardingProgress::Step(self.step)
    }

    pub fn skip(&mut self) -> OnboardingProgress {
        self.done = true;
        OnboardingProgress::Completed
    }

    #[must_use]
    pub fn next_label(&self) -> &'static str {
        if self.is_last() { "Let's Go! 🚀" } else { "Next →" }
    }

    #[must_use]
    pub fn skip_label(&self) -> &'static str {
        "Skip"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_all_steps_then_completes() {
        let mut flow = OnboardingFlow::new();
        assert_eq!(flow.current().map(|s| s.title), Some("Welcome to TripLearn!"));
        assert_eq!(flow.next(), OnboardingProgress::Step(1));
        assert_eq!(flow.next(), OnboardingProgress::Step(2));
        assert_eq!(flow.next(), OnboardingProgress::Step(3));
        assert_eq!(flow.next_label(), "Let's Go! 🚀");
        assert_eq!(flow.next(), OnboardingProgress::Completed);
        assert!(flow.is_done());
        assert_eq!(flow.current(), None);
    }

    #[test]
    fn skip_completes_immediately() {
        let mut flow = OnboardingFlow::new();
        assert_eq!(flow.next_label(), "Next →");
        assert_eq!(flow.skip(), OnboardingProgress::Completed);
        assert!(flow.is_done());
    }

    #[test]
    fn last_step_describes_streaks_and_replays() {
        let last = &ONBOARDING_STEPS[ONBOARDING_STEPS.len() - 1];
        assert_eq!(last.title, "Keep Your Streak!");
        assert!(last.description.contains("streak"));
        for step in &ONBOARDING_STEPS {
            assert!(!step.description.to_lowercase().contains("heart"), "{}", step.title);
        }
    }
}
