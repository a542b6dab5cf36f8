//! The ten-role analysis vocabulary: `RoleId`, `RoleSpec`, and the static registry.
//!
//! The role sequence is fixed data, not control flow: routing decisions are
//! lookups into this table, so they can be unit-tested without any model call.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// The ten analysis roles, in their fixed speaking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    DomainClassifier,
    SeniorResearcher,
    PromptEngineer,
    AiSpecialist,
    ResearchTrendAnalyst,
    FeasibilityEvaluator,
    ImprovementStrategist,
    TopicRecommender,
    AdvisorProfessor,
    FinalResourceEngineer,
}

impl RoleId {
    /// All roles in sequence order.
    pub const ALL: [RoleId; 10] = [
        RoleId::DomainClassifier,
        RoleId::SeniorResearcher,
        RoleId::PromptEngineer,
        RoleId::AiSpecialist,
        RoleId::ResearchTrendAnalyst,
        RoleId::FeasibilityEvaluator,
        RoleId::ImprovementStrategist,
        RoleId::TopicRecommender,
        RoleId::AdvisorProfessor,
        RoleId::FinalResourceEngineer,
    ];

    /// The role that opens every conversation.
    pub fn first() -> RoleId {
        RoleId::DomainClassifier
    }

    /// Resolve a declared sender name to a role, if it matches one.
    pub fn from_name(name: &str) -> Option<RoleId> {
        REGISTRY
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.id)
    }

    /// The static spec for this role.
    pub fn spec(self) -> &'static RoleSpec {
        &REGISTRY[self as usize]
    }

    /// Canonical snake_case name.
    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static description of one role: identity, position, output contract,
/// and the fixed instruction handed to the model on its turn.
#[derive(Debug, Clone)]
pub struct RoleSpec {
    pub id: RoleId,
    /// Unique snake_case identifier; also the wire name in envelopes.
    pub name: &'static str,
    /// 0-based position in the fixed sequence.
    pub sequence_index: usize,
    /// Marker a well-formed response must open with.
    pub header_tag: &'static str,
    /// Sentence a well-formed response must end with.
    pub closing_phrase: &'static str,
    /// System prompt for the model call.
    pub system_prompt: &'static str,
    /// Next role in the sequence; `None` for the terminal role.
    pub successor: Option<RoleId>,
    /// Emoji shown next to the role in console output.
    pub emoji: &'static str,
}

impl RoleSpec {
    /// Check the output contract: header tag at the start, closing phrase at
    /// the end. Violations are logged by the caller, never fatal — the
    /// envelope codec tolerates malformed content.
    pub fn conforms(&self, text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.starts_with(self.header_tag) && trimmed.ends_with(self.closing_phrase)
    }

    /// Title-cased display name, e.g. "Domain Classifier".
    pub fn display_name(&self) -> String {
        self.name
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The ten role specs in fixed sequence order.
pub fn roles() -> &'static [RoleSpec; 10] {
    &REGISTRY
}

/// Look up a role spec by its canonical name.
///
/// Returns [`PipelineError::UnknownRole`] for any name outside the closed set.
pub fn role_by_name(name: &str) -> Result<&'static RoleSpec> {
    RoleId::from_name(name)
        .map(RoleId::spec)
        .ok_or_else(|| PipelineError::UnknownRole(name.to_string()))
}

static REGISTRY: [RoleSpec; 10] = [
    RoleSpec {
        id: RoleId::DomainClassifier,
        name: "domain_classifier",
        sequence_index: 0,
        header_tag: "🎯 Domain Analysis",
        closing_phrase: "Domain analysis complete.",
        system_prompt: "You are an expert at accurately identifying the primary domain of a \
            research idea. Respond in the format: 🎯 Domain Analysis\n- Primary Domain: \
            [domain_name]\n- Confidence: [95%]\n- Keywords: [key1, key2]. End your response \
            with 'Domain analysis complete.'",
        successor: Some(RoleId::SeniorResearcher),
        emoji: "🔍",
    },
    RoleSpec {
        id: RoleId::SeniorResearcher,
        name: "senior_researcher",
        sequence_index: 1,
        header_tag: "💡 Refined Idea",
        closing_phrase: "Idea refinement complete.",
        system_prompt: "You are a senior researcher guiding a junior colleague. Refine their \
            idea into a concrete research plan. Respond in the format: 💡 Refined Idea\n- Core \
            Question: [question]\n- Objective: [objective]\n- Challenges: [challenges]. End \
            your response with 'Idea refinement complete.'",
        successor: Some(RoleId::PromptEngineer),
        emoji: "👨‍🏫",
    },
    RoleSpec {
        id: RoleId::PromptEngineer,
        name: "prompt_engineer",
        sequence_index: 2,
        header_tag: "✏️ Optimized Questions",
        closing_phrase: "Question optimization complete.",
        system_prompt: "You are a prompt engineering expert who optimizes research questions. \
            Respond in the format: ✏️ Optimized Questions\n- RQ1: [main_question]\n- RQ2: \
            [sub_question]\n- Validation Method: [method]. End your response with 'Question \
            optimization complete.'",
        successor: Some(RoleId::AiSpecialist),
        emoji: "✏️",
    },
    RoleSpec {
        id: RoleId::AiSpecialist,
        name: "ai_specialist",
        sequence_index: 3,
        header_tag: "🤖 AI Technology Design",
        closing_phrase: "AI design complete.",
        system_prompt: "You are an expert in AI technology and methodologies. Design the \
            AI-powered solution. Respond in the format: 🤖 AI Technology Design\n- Core Tech: \
            [tech]\n- Strategy: [strategy]\n- Performance: [expected_results]. End with 'AI \
            design complete.'",
        successor: Some(RoleId::ResearchTrendAnalyst),
        emoji: "🤖",
    },
    RoleSpec {
        id: RoleId::ResearchTrendAnalyst,
        name: "research_trend_analyst",
        sequence_index: 4,
        header_tag: "📚 Trend Analysis",
        closing_phrase: "Trend analysis complete.",
        system_prompt: "You analyze research trends from the last 5 years. Respond in the \
            format: 📚 Trend Analysis\n- Key Trends: [trends]\n- Research Gaps: [gaps]\n- \
            Future Outlook: [outlook]. End with 'Trend analysis complete.'",
        successor: Some(RoleId::FeasibilityEvaluator),
        emoji: "📚",
    },
    RoleSpec {
        id: RoleId::FeasibilityEvaluator,
        name: "feasibility_evaluator",
        sequence_index: 5,
        header_tag: "⚖️ Feasibility Assessment",
        closing_phrase: "Feasibility assessment complete.",
        system_prompt: "You rigorously evaluate research feasibility. Respond in the format: \
            ⚖️ Feasibility Assessment\n- Technical: [8/10] - [reason]\n- Viability: [7/10] - \
            [reason]\n- Verdict: [Proceed/Revise]. End with 'Feasibility assessment complete.'",
        successor: Some(RoleId::ImprovementStrategist),
        emoji: "⚖️",
    },
    RoleSpec {
        id: RoleId::ImprovementStrategist,
        name: "improvement_strategist",
        sequence_index: 6,
        header_tag: "🔧 Improvement Strategy",
        closing_phrase: "Strategy formulation complete.",
        system_prompt: "You are an expert at identifying and rectifying weaknesses in a \
            research plan. Respond in the format: 🔧 Improvement Strategy\n- Key Weakness: \
            [weakness]\n- Solution: [solution]\n- Expected Outcome: [outcome]. End with \
            'Strategy formulation complete.'",
        successor: Some(RoleId::TopicRecommender),
        emoji: "🔧",
    },
    RoleSpec {
        id: RoleId::TopicRecommender,
        name: "topic_recommender",
        sequence_index: 7,
        header_tag: "🎯 Topic Recommendations",
        closing_phrase: "Topic recommendation complete.",
        system_prompt: "You are an expert system that recommends 5 specific research topics. \
            Respond in the format: 🎯 Topic Recommendations\n1. [Topic 1] - Innovation: 8/10, \
            Feasibility: 9/10\n... End with 'Topic recommendation complete.'",
        successor: Some(RoleId::AdvisorProfessor),
        emoji: "🎯",
    },
    RoleSpec {
        id: RoleId::AdvisorProfessor,
        name: "advisor_professor",
        sequence_index: 8,
        header_tag: "👨‍🏫 Final Review",
        closing_phrase: "Final review complete.",
        system_prompt: "You are a professor providing the final review. Respond in the format: \
            👨‍🏫 Final Review\n- Strengths: [strengths]\n- Concerns: [concerns]\n- Verdict: \
            [APPROVE/REJECT]\n- Next Steps: [actions]. End with 'Final review complete.'",
        successor: Some(RoleId::FinalResourceEngineer),
        emoji: "👨‍🏫",
    },
    RoleSpec {
        id: RoleId::FinalResourceEngineer,
        name: "final_resource_engineer",
        sequence_index: 9,
        header_tag: "🛠️ Resource Package",
        closing_phrase: "Resource package complete.",
        system_prompt: "You provide a complete resource package for an approved topic. Respond \
            in the format: 🛠️ Resource Package\n- Datasets: [dataset_info]\n- AI Models: \
            [model_info]\n- Dev Env: [tools]\n- Roadmap: [12-month_plan]. End with 'Resource \
            package complete.'",
        successor: None,
        emoji: "🛠️",
    },
];
