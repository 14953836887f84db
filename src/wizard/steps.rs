//! Step index mapping.
//!
//! Sequence: a fixed prefix of `PREFIX_STEPS` pages, then `repeat_count` STAR examples of
//! `SUB_STEPS` pages each, then a single review page. Every boundary check in the crate
//! (last STAR step, terminal step, first step of a section) is derived here.

use serde::{Deserialize, Serialize};

/// Fixed pages before the first STAR example.
pub const PREFIX_STEPS: u32 = 5;

/// Pages per STAR example.
pub const SUB_STEPS: u32 = 4;

const ORDINALS: [&str; 10] = [
    "First", "Second", "Third", "Fourth", "Fifth", "Sixth", "Seventh", "Eighth", "Ninth",
    "Tenth",
];

/// Coarse grouping of steps. Declaration order is the on-screen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Intro,
    RoleDetails,
    Experience,
    Guidance,
    StarIntro,
    StarExamples,
    Review,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Intro,
        Section::RoleDetails,
        Section::Experience,
        Section::Guidance,
        Section::StarIntro,
        Section::StarExamples,
        Section::Review,
    ];

    pub fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn is_terminal(self) -> bool {
        self == Section::Review
    }

    /// Intro pages carry no fields and always pass validation.
    pub fn requires_validation(self) -> bool {
        !matches!(self, Section::Intro | Section::StarIntro | Section::Review)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Intro => "intro",
            Section::RoleDetails => "role_details",
            Section::Experience => "experience",
            Section::Guidance => "guidance",
            Section::StarIntro => "star_intro",
            Section::StarExamples => "star_examples",
            Section::Review => "review",
        }
    }

    fn header(self) -> &'static str {
        match self {
            Section::Intro => "Welcome",
            Section::RoleDetails => "Role Details",
            Section::Experience => "Your Experience",
            Section::Guidance => "Pitch Guidance",
            Section::StarIntro => "STAR Examples",
            Section::StarExamples => "STAR Example",
            Section::Review => "Review Your Pitch",
        }
    }
}

/// The four STAR questions, in the order they are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarPart {
    Situation,
    Task,
    Action,
    Result,
}

impl StarPart {
    pub const ORDER: [StarPart; SUB_STEPS as usize] = [
        StarPart::Situation,
        StarPart::Task,
        StarPart::Action,
        StarPart::Result,
    ];

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            StarPart::Situation => "Situation",
            StarPart::Task => "Task",
            StarPart::Action => "Action",
            StarPart::Result => "Result",
        }
    }

    /// Key of this part inside a STAR example record.
    pub fn key(self) -> &'static str {
        match self {
            StarPart::Situation => "situation",
            StarPart::Task => "task",
            StarPart::Action => "action",
            StarPart::Result => "result",
        }
    }
}

/// Position inside the repeated STAR block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarPosition {
    /// 0-based STAR example index.
    pub example: u32,
    pub part: StarPart,
    /// "First", "Second", ...
    pub ordinal: String,
}

/// Derived projection of a step number. Never cached across a change of step or repeat count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    pub step: u32,
    pub section: Section,
    pub header: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star: Option<StarPosition>,
}

impl StepDescriptor {
    pub fn ordinal(&self) -> Option<&str> {
        self.star.as_ref().map(|s| s.ordinal.as_str())
    }

    pub fn sub_step(&self) -> Option<u32> {
        self.star.as_ref().map(|s| s.part.index())
    }
}

pub fn ordinal_label(index: u32) -> String {
    ORDINALS
        .get(index as usize)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Example {}", index + 1))
}

pub fn total_steps(repeat_count: u32) -> u32 {
    PREFIX_STEPS + repeat_count * SUB_STEPS + 1
}

/// Last sub-step of the last STAR example. Passing validation here opens the generation prompt.
pub fn boundary_step(repeat_count: u32) -> u32 {
    PREFIX_STEPS + repeat_count * SUB_STEPS
}

pub fn terminal_step(repeat_count: u32) -> u32 {
    total_steps(repeat_count)
}

pub fn is_boundary_step(step: u32, repeat_count: u32) -> bool {
    repeat_count > 0 && step == boundary_step(repeat_count)
}

pub fn clamp_step(step: u32, repeat_count: u32) -> u32 {
    step.clamp(1, total_steps(repeat_count))
}

/// First step number belonging to `section`.
pub fn first_step_of(section: Section, repeat_count: u32) -> u32 {
    match section {
        Section::Intro => 1,
        Section::RoleDetails => 2,
        Section::Experience => 3,
        Section::Guidance => 4,
        Section::StarIntro => 5,
        // With zero examples the block is empty; land on review.
        Section::StarExamples if repeat_count == 0 => terminal_step(repeat_count),
        Section::StarExamples => PREFIX_STEPS + 1,
        Section::Review => terminal_step(repeat_count),
    }
}

/// Map `(step, repeat_count)` to its section, header, and STAR position.
///
/// Total over all inputs: step 0 is treated as step 1 and anything past the review page maps
/// to review. Callers clamp `step` themselves when the repeat count changes.
pub fn describe_step(step: u32, repeat_count: u32) -> StepDescriptor {
    let step = step.max(1);

    if step <= PREFIX_STEPS {
        let section = Section::ALL[(step - 1) as usize];
        return StepDescriptor {
            step,
            section,
            header: section.header().to_string(),
            star: None,
        };
    }

    if step <= boundary_step(repeat_count) {
        let offset = step - PREFIX_STEPS - 1;
        let example = offset / SUB_STEPS;
        let part = StarPart::ORDER[(offset % SUB_STEPS) as usize];
        let ordinal = ordinal_label(example);
        return StepDescriptor {
            step,
            section: Section::StarExamples,
            header: format!("{} STAR Example: {}", ordinal, part.label()),
            star: Some(StarPosition {
                example,
                part,
                ordinal,
            }),
        };
    }

    StepDescriptor {
        step,
        section: Section::Review,
        header: Section::Review.header().to_string(),
        star: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_examples_scenario() {
        assert_eq!(total_steps(2), 14);

        let d6 = describe_step(6, 2);
        assert_eq!(d6.section, Section::StarExamples);
        assert_eq!(d6.ordinal(), Some("First"));
        assert_eq!(d6.sub_step(), Some(0));
        assert_eq!(d6.header, "First STAR Example: Situation");

        let d13 = describe_step(13, 2);
        assert_eq!(d13.section, Section::StarExamples);
        assert_eq!(d13.ordinal(), Some("Second"));
        assert_eq!(d13.sub_step(), Some(3));

        let d14 = describe_step(14, 2);
        assert_eq!(d14.section, Section::Review);
        assert!(d14.section.is_terminal());
        assert_eq!(d14.star, None);
    }

    #[test]
    fn prefix_steps_map_to_fixed_sections() {
        let expected = [
            Section::Intro,
            Section::RoleDetails,
            Section::Experience,
            Section::Guidance,
            Section::StarIntro,
        ];
        for (i, section) in expected.iter().enumerate() {
            let d = describe_step(i as u32 + 1, 3);
            assert_eq!(d.section, *section, "step {}", i + 1);
            assert!(d.star.is_none());
        }
    }

    #[test]
    fn section_never_decreases_as_step_increases() {
        for repeat in 0..=6 {
            let mut last = Section::Intro;
            for step in 1..=total_steps(repeat) + 3 {
                let d = describe_step(step, repeat);
                assert!(
                    d.section >= last,
                    "section went backwards at step {} (repeat={})",
                    step,
                    repeat
                );
                last = d.section;
            }
            assert_eq!(last, Section::Review);
        }
    }

    #[test]
    fn mapping_is_deterministic() {
        for step in 1..=20 {
            assert_eq!(describe_step(step, 4), describe_step(step, 4));
        }
    }

    #[test]
    fn total_tracks_repeat_count() {
        assert_eq!(total_steps(3), 18);
        assert_eq!(total_steps(4), 22);
        assert_eq!(boundary_step(3), 17);
        assert_eq!(terminal_step(3), 18);
        assert!(is_boundary_step(13, 2));
        assert!(!is_boundary_step(13, 3));
    }

    #[test]
    fn shrinking_repeat_count_requires_clamp() {
        // Step 20 was a STAR step with four examples; with two it is past the end.
        assert_eq!(describe_step(20, 4).section, Section::StarExamples);
        assert_eq!(describe_step(20, 2).section, Section::Review);
        assert_eq!(clamp_step(20, 2), 14);
        assert_eq!(clamp_step(0, 2), 1);
    }

    #[test]
    fn first_step_of_each_section() {
        assert_eq!(first_step_of(Section::Intro, 2), 1);
        assert_eq!(first_step_of(Section::StarIntro, 2), 5);
        assert_eq!(first_step_of(Section::StarExamples, 2), 6);
        assert_eq!(first_step_of(Section::Review, 2), 14);
        assert_eq!(first_step_of(Section::Review, 4), 22);
        for section in Section::ALL {
            assert_eq!(describe_step(first_step_of(section, 3), 3).section, section);
        }
    }

    #[test]
    fn ordinals_stay_total_past_ten() {
        assert_eq!(ordinal_label(0), "First");
        assert_eq!(ordinal_label(9), "Tenth");
        assert_eq!(ordinal_label(10), "Example 11");
    }
}
