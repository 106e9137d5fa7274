//! Cover-letter prompt construction.

use crate::types::{JobPosting, UserProfile};

/// Description characters sent to the model.
pub const DESCRIPTION_LIMIT: usize = 1000;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant writing professional, personalized cover letters, including specific contact details at the end.";

/// Build the user prompt for one posting.
pub fn format_cover_letter_prompt(profile: &UserProfile, posting: &JobPosting) -> String {
    let skills = if profile.skills.is_empty() {
        "- Not specified".to_string()
    } else {
        profile
            .skills
            .iter()
            .map(|(group, list)| format!("- {}: {}", group.replace('_', " "), list))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let salutation = match &posting.recruiter {
        Some(recruiter) => format!("Dear {},", recruiter.name),
        None => "Dear Hiring Manager,".to_string(),
    };

    let description = posting
        .description
        .as_deref()
        .map(truncate_description)
        .unwrap_or_else(|| "(no description available)".to_string());

    format!(
        r#"You are assisting {name}, {role}, in writing a personalized cover letter.
Write a compelling cover letter for the position of '{title}' at '{company}'.

About the applicant:
- Summary: {summary}
- Key skills:
{skills}
- Experience highlights: {highlights}
- Current project: {project}
- Soft skills: {soft_skills}

Job description (tailor the letter to it):
--- START JOB DESCRIPTION ---
{description}
--- END JOB DESCRIPTION ---

Structure:
1. Opening: start with "{salutation}" and state the applicant's role and specialization.
2. Core pitch: connect the applicant's approach to this role and company.
3. Evidence: the 2-3 most relevant skills or experiences for this description.
4. Personal attributes: key soft skills.
5. Closing: strong interest and a call to action.
6. Sign-off: "Best regards," followed EXACTLY by this contact block:
{signature}

Be concise and professional. Do not leave placeholders such as [Company Name]."#,
        name = profile.full_name,
        role = non_empty(&profile.role, "an engineer"),
        title = posting.title,
        company = posting.company,
        summary = non_empty(&profile.summary, "Not specified"),
        skills = skills,
        highlights = if profile.experience_highlights.is_empty() {
            "Not specified".to_string()
        } else {
            profile.experience_highlights.join("; ")
        },
        project = profile.current_project.as_deref().unwrap_or("Not specified"),
        soft_skills = profile.soft_skills.as_deref().unwrap_or("Not specified"),
        description = description,
        salutation = salutation,
        signature = profile.contact.signature_block(&profile.full_name),
    )
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Cut at a character boundary, marking the cut.
fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => format!("{}...", &description[..cut]),
        None => description.to_string(),
    }
}
