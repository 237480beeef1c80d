//! Offline reply generation when no live reply is available.
//!
//! An ordered table of [`FallbackRule`]s, first match wins. The two safety
//! buckets are built from the same crisis tiers as
//! [`CrisisDetector`](crate::crisis::CrisisDetector) and always sit at the
//! head of the table, so both components frame crisis language the same way.

use crate::matcher::{KeywordMatcher, KeywordSet, normalize};
use crate::templates::{BoxedRng, DEFAULT_SUPPORT_MESSAGE, pick};
use bravomind_config::CrisisKeywords;
use bravomind_core::message::Message;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackBucket {
    Crisis,
    Hopelessness,
    Stress,
    Sleep,
    Anger,
    Loneliness,
    SupportSeeking,
    Trauma,
    MindShield,
    StartMission,
    MissionCenter,
    Missions,
    Family,
    Career,
    CommandCenter,
    RallyPoint,
    MentalGames,
    Profile,
    DailyChallenges,
    Gratitude,
    PositiveAffect,
    Greeting,
    Default,
}

impl FallbackBucket {
    pub fn is_safety(&self) -> bool {
        matches!(self, Self::Crisis | Self::Hopelessness)
    }
}

/// One row of the decision table.
#[derive(Debug, Clone)]
pub struct FallbackRule {
    pub bucket: FallbackBucket,
    pub keywords: KeywordSet,
    /// More than one entry means the reply is chosen at random.
    pub responses: Vec<String>,
}

impl FallbackRule {
    fn new(bucket: FallbackBucket, keywords: &[&str], responses: &[&str]) -> Self {
        Self {
            bucket,
            keywords: KeywordSet::new(format!("{bucket:?}"), keywords.iter().copied()),
            responses: responses.iter().map(|r| r.to_string()).collect(),
        }
    }
}

const CRISIS_REPLY: &str = "Battle buddy, I'm very concerned about you right now. Please reach out for immediate help: Veterans Crisis Line at 988 (Press 1), Crisis Text Line at 838255, or call 911. You matter, and there are people who want to help you through this. I'm here with you.";

const HOPELESSNESS_REPLY: &str = "I hear the pain in your words, warrior. These feelings are real, but they're not permanent. Please consider reaching out to the Veterans Crisis Line at 988 (Press 1). You've survived tough missions before - you have the strength to get through this too. What's one small thing we can do right now?";

const GREETINGS: &[&str] = &[
    "Roger that, battle buddy! Good to see you. How are you holding up today?",
    "Hey there, warrior! I'm here and ready to support you. What's on your mind?",
    "Solid copy! Welcome back. How can I help you tackle today's mission?",
    "Good to see you, battle buddy. What's your current situation report?",
];

const DEFAULT_REPLIES: &[&str] = &[
    "Copy that, battle buddy. Tell me more about what's on your mind.",
    "I'm tracking with you. How can I support you through this?",
    "Roger that. I'm here to listen and help however I can.",
    "Solid copy. What's your current situation report?",
    "I've got your back, warrior. Let's work through this together.",
    "Message received loud and clear. What do you need right now?",
    "Standing by to assist. What's your priority today?",
];

/// Topic rows, in priority order, following the safety rows.
fn topic_rules() -> Vec<FallbackRule> {
    use FallbackBucket::*;
    vec![
        FallbackRule::new(
            Stress,
            &["stress", "anxious", "worried", "overwhelmed"],
            &["Roger that, battle buddy. Try tactical breathing: 4 counts in, hold 4, out 4. Check Mission Center for stress management or Mental Games for cognitive exercises."],
        ),
        FallbackRule::new(
            Sleep,
            &["sleep", "tired", "insomnia", "nightmares"],
            &["Sleep protocol: consistent bedtime, cool dark room, no screens 1 hour before bed. Track patterns in Command Center, try mindfulness in Daily Stability Challenges."],
        ),
        FallbackRule::new(
            Anger,
            &["angry", "mad", "frustrated", "rage"],
            &["Channel that anger constructively: physical activity, tactical breathing, or talk it out. Mental Games has emotion management exercises, Rally Point connects you with understanding peers."],
        ),
        FallbackRule::new(
            Loneliness,
            &["lonely", "isolated", "alone", "disconnected"],
            &["You're not alone, battle buddy. Rally Point connects you with veterans who understand. Check Mission Center for community engagement tasks."],
        ),
        FallbackRule::new(
            SupportSeeking,
            &["want to talk", "talk to someone", "need someone to talk"],
            &["Roger that, battle buddy. Head to Rally Point - that's where you can connect with fellow veterans who understand what you're going through. It's a secure space for peer support with people who speak your language. You don't have to face this alone."],
        ),
        FallbackRule::new(
            Trauma,
            &["ptsd", "trauma", "flashback", "triggered"],
            &["PTSD is a real injury requiring proper treatment. Track triggers in Command Center, use grounding techniques in Daily Stability Challenges. Crisis Protocol in profile links to VA resources."],
        ),
        FallbackRule::new(
            MindShield,
            &["operation mindshield", "mindshield"],
            &["Operation MindShield is a 7-day mission designed to enhance your emotional resilience and reduce stress. Day 1 focuses on Emotional Reconnaissance - identifying and labeling emotions. Day 2 is Stress Inoculation Training with 10-minute stress-reduction techniques. Day 3 involves Support Network Engagement, and Day 4 is about creating a personalized Tactical Wellness Plan. Would you like to begin this mission, battle buddy?"],
        ),
        // Only the exact multi-word phrases sit ahead of the bare "mission"
        // row, which would otherwise swallow them. Plain "missions" and
        // "tasks" still belong to Missions.
        FallbackRule::new(
            StartMission,
            &["start mission", "begin mission", "new mission"],
            &["Roger that! Ready to deploy on Operation MindShield. This 7-day mission will enhance your emotional resilience through daily objectives. Day 1 starts with Emotional Reconnaissance - identifying and labeling your emotions throughout the day. Would you like me to provide more details about each day's objectives, or are you ready to begin Day 1?"],
        ),
        FallbackRule::new(
            MissionCenter,
            &["mission center"],
            &["The Mission Center contains structured mental health tasks designed with military precision. Each mission has clear objectives, difficulty ratings, and completion criteria. These aren't just random activities - they're evidence-based interventions translated into military language and framework."],
        ),
        FallbackRule::new(
            Missions,
            &["mission", "task", "goal", "gratitude"],
            &["Outstanding! Missions give us purpose and direction. Check out the Mission Center for wellness tasks like '3 Gratitude Targets' (identify things you're thankful for), 'Tactical Breathing Drill' (stress management), or 'Comms Check' (reach out to a battle buddy). The Daily Stability Challenges in the Command Center also offer structured activities for mental fitness."],
        ),
        FallbackRule::new(
            Family,
            &["family", "relationship", "spouse", "kids"],
            &["Family relationships can be challenging after service - the transition affects everyone. The Mission Center has communication exercises designed specifically for family reconnection. The Rally Point also connects you with veterans who have navigated similar family challenges successfully."],
        ),
        FallbackRule::new(
            Career,
            &["job", "work", "civilian", "transition"],
            &["The transition to civilian life is one of the toughest missions we face. Your military skills are valuable - leadership, discipline, problem-solving. The Command Center has resources for career development, and the Mission Center includes tasks for building your civilian resume and networking skills."],
        ),
        FallbackRule::new(
            CommandCenter,
            &["dashboard", "command center", "overview"],
            &["The Command Center is your mission headquarters, battle buddy. It gives you an overview of your mental wellness status, quick access to daily challenges, and your current mission progress. It's designed to give you situational awareness of your mental fitness at a glance."],
        ),
        FallbackRule::new(
            RallyPoint,
            &["rally point", "peers", "other veterans", "connect"],
            &["The Rally Point is where you connect with fellow veterans who understand what you're going through. It's a secure space to share experiences, offer support, and build that unit cohesion that many miss after leaving service. No civilians - just battle buddies who speak your language."],
        ),
        FallbackRule::new(
            MentalGames,
            &["games", "mental games", "cognitive", "training"],
            &["Roger that, battle buddy! Mental Games are cognitive training exercises designed specifically for veterans. Features include: Memory Recon (sequence recall, pattern recognition), Focus Forward (attention drills, concentration tasks), and Precision Targeting (reaction time, decision-making). These tactical challenges strengthen mental agility, focus, and emotional regulation using evidence-based cognitive behavioral therapy techniques adapted for military minds."],
        ),
        FallbackRule::new(
            Profile,
            &["profile", "settings", "progress"],
            &["Your Profile section contains your personal settings, progress tracking, and crisis protocol information. It's where you can customize your experience, review your mission history, and set up emergency contacts. Think of it as your personnel file and mission log combined."],
        ),
        FallbackRule::new(
            DailyChallenges,
            &["challenges", "daily", "stability"],
            &["The Daily Stability Challenges are like preventative maintenance for your mind. They include Mindfulness Exercises and Gratitude Journals - small, consistent actions that build mental resilience over time. Just like physical training, mental fitness requires regular workouts."],
        ),
        FallbackRule::new(
            Gratitude,
            &["thanks", "thank you", "appreciate"],
            &["No need to thank me, battle buddy - we look out for each other. That's what being part of the brotherhood/sisterhood means. You'd do the same for me. How else can I support you today?"],
        ),
        FallbackRule::new(
            PositiveAffect,
            &["good", "great", "better", "fine"],
            &["Outstanding to hear, warrior! Maintaining mental fitness is just like physical training - consistency is key. Keep up the good work. Check out the Daily Stability Challenges in the Command Center to maintain your momentum."],
        ),
        FallbackRule::new(Greeting, &["hi", "hello", "hey"], GREETINGS),
    ]
}

pub struct FallbackResponder {
    rules: Vec<FallbackRule>,
    defaults: Vec<String>,
    matcher: Arc<dyn KeywordMatcher>,
    rng: Mutex<BoxedRng>,
}

impl fmt::Debug for FallbackResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackResponder")
            .field("rules", &self.rules.len())
            .field("defaults", &self.defaults.len())
            .field("matcher", &self.matcher)
            .finish()
    }
}

impl FallbackResponder {
    /// Build the standard table with the crisis tiers at its head.
    pub fn new(crisis: &CrisisKeywords, matcher: Arc<dyn KeywordMatcher>, rng: BoxedRng) -> Self {
        let mut rules = vec![
            FallbackRule {
                bucket: FallbackBucket::Crisis,
                keywords: KeywordSet::new("Crisis", &crisis.high),
                responses: vec![CRISIS_REPLY.to_string()],
            },
            FallbackRule {
                bucket: FallbackBucket::Hopelessness,
                keywords: KeywordSet::new("Hopelessness", &crisis.medium),
                responses: vec![HOPELESSNESS_REPLY.to_string()],
            },
        ];
        rules.extend(topic_rules());

        Self {
            rules,
            defaults: DEFAULT_REPLIES.iter().map(|r| r.to_string()).collect(),
            matcher,
            rng: Mutex::new(rng),
        }
    }

    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }

    fn matching_rule(&self, input: &str) -> Option<&FallbackRule> {
        let text = normalize(input);
        self.rules
            .iter()
            .find(|rule| self.matcher.matches(&text, &rule.keywords))
    }

    pub fn bucket_for(&self, input: &str) -> FallbackBucket {
        self.matching_rule(input)
            .map_or(FallbackBucket::Default, |rule| rule.bucket)
    }

    /// A canned reply for `input`. History is accepted but does not affect
    /// bucket selection.
    pub fn generate(&self, input: &str, _history: &[Message]) -> String {
        let (bucket, candidates) = match self.matching_rule(input) {
            Some(rule) => (rule.bucket, rule.responses.as_slice()),
            None => (FallbackBucket::Default, self.defaults.as_slice()),
        };
        debug!(?bucket, "Fallback bucket selected");

        pick(&self.rng, candidates)
            .unwrap_or(DEFAULT_SUPPORT_MESSAGE)
            .to_string()
    }
}
