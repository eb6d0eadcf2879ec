use chrono::{Duration, Local};

use super::conversation::{ChatMessage, Conversation};

/// Prompts offered by the empty state
pub const PROMPT_SUGGESTIONS: [&str; 3] = [
    "Prioritize the tasks I need to finish today",
    "Summarize this week's meetings",
    "Help me categorize my pending tasks",
];

/// Read-only demo threads shown when sample data is switched on
pub fn sample_conversations() -> Vec<Conversation> {
    vec![
        sample(
            "sample-1",
            "Prioritize today's work",
            1,
            "Help me prioritize these tasks:\n1. Reply to customer emails\n2. Team meeting 10:00\n3. Write the sales summary report\n4. Fix the login page bug\n5. Update documentation",
            "## Today's priorities\n\nHere is how I would order your list:\n\n### High priority\n1. **Team meeting 10:00** - fixed time, prepare beforehand\n2. **Fix the login page bug** - directly affects users\n\n### Medium priority\n3. **Reply to customer emails** - keep customers from waiting\n4. **Write the sales summary report** - important but not urgent\n\n### Low priority\n5. **Update documentation** - do it when you have slack\n\n### Summary\n- Morning: prepare for the meeting, then fix the bug\n- Afternoon: emails and the report\n- End of day: `docs` updates",
        ),
        sample(
            "sample-2",
            "This week's meetings",
            2,
            "Summarize my meetings this week:\n- Mon: Sprint Planning 09:00\n- Tue: Client Review 14:00\n- Wed: Design Review 11:00\n- Thu: 1-on-1 with Manager 15:00\n- Fri: Retrospective 16:00",
            "## This week's meetings\n\nYou have **5 meetings** this week:\n\n### Details\n- **Mon 09:00** - Sprint Planning\n- **Tue 14:00** - Client Review\n- **Wed 11:00** - Design Review\n- **Thu 15:00** - 1-on-1 with Manager\n- **Fri 16:00** - Retrospective\n\n### Notes\n- Meetings are spread evenly, no day is overloaded\n- Prepare the demo before Tuesday's client review\n- Wednesday and Thursday mornings are good for focus work",
        ),
    ]
}

fn sample(id: &str, title: &str, hours_ago: i64, question: &str, answer: &str) -> Conversation {
    let created_at = Local::now() - Duration::hours(hours_ago);

    let mut user = ChatMessage::user(question);
    user.id = format!("{}-m1", id);
    user.timestamp = created_at + Duration::minutes(1);

    let mut agent = ChatMessage::agent(answer);
    agent.id = format!("{}-m2", id);
    agent.timestamp = created_at + Duration::minutes(3);

    let mut conversation = Conversation::new().with_title(title);
    conversation.id = id.to_string();
    conversation.session_id = format!("{}-session", id);
    conversation.created_at = created_at;
    conversation.messages = vec![user, agent];
    conversation
}
