//! Static workflow rules prepended to every prompt handed to Cursor.
//!
//! The rules describe the merge-request / preview-URL workflow the assistant
//! must follow. Runtime values (branch, project, demo URL, labels) come from an
//! explicit [`InstructionConfig`] so rendering stays a pure function.

/// Label attached to every merge request created from a relayed request.
pub const DEFAULT_MR_LABEL: &str = "ai-assisted::cursor-ai";

const DEFAULT_BRANCH_PREFIX: &str = "bot/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionConfig {
    pub target_branch: Option<String>,
    pub project_url: Option<String>,
    pub project_id: Option<String>,
    pub demo_base_url: Option<String>,
    pub extra_labels: Vec<String>,
    pub branch_prefix: String,
}

impl Default for InstructionConfig {
    fn default() -> Self {
        Self {
            target_branch: None,
            project_url: None,
            project_id: None,
            demo_base_url: None,
            extra_labels: Vec::new(),
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
        }
    }
}

impl InstructionConfig {
    /// Quoted label list, default label first, blanks and duplicates dropped.
    pub fn render_labels(&self) -> String {
        let mut labels = vec![DEFAULT_MR_LABEL.to_string()];
        for label in &self.extra_labels {
            let label = label.trim();
            if !label.is_empty() && !labels.iter().any(|existing| existing == label) {
                labels.push(label.to_string());
            }
        }
        let quoted = labels
            .iter()
            .map(|label| format!("'{label}'"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{quoted}]")
    }

    fn branch_pattern(&self) -> String {
        let prefix = self.branch_prefix.trim();
        let prefix = if prefix.is_empty() {
            DEFAULT_BRANCH_PREFIX
        } else {
            prefix
        };
        format!("{prefix}{{jira-ticket-id}}")
    }
}

fn configured_or_placeholder(value: Option<&str>, name: &str) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("<not configured: {name}>"))
}

/// Renders the workflow rules block for the given configuration.
pub fn render_instruction_template(config: &InstructionConfig) -> String {
    let target_branch =
        configured_or_placeholder(config.target_branch.as_deref(), "GITLAB_MR_TARGET_BRANCH");
    let project_url =
        configured_or_placeholder(config.project_url.as_deref(), "GITLAB_PROJECT_URL");
    let project_id = configured_or_placeholder(config.project_id.as_deref(), "GITLAB_PROJECT_ID");
    let demo_base_url =
        configured_or_placeholder(config.demo_base_url.as_deref(), "SAMPLE_DEMO_URL");
    let branch_pattern = config.branch_pattern();

    let lines = vec![
        "# Cursor Rules for Slack AI Assistant".to_string(),
        String::new(),
        "## Context".to_string(),
        "You are handling a request relayed from Slack. The requester wants a Merge Request (MR) and, when applicable, a Preview URL. The request itself follows these rules as a Slack message.".to_string(),
        String::new(),
        "## Required Actions".to_string(),
        "1. **Analyze the request** - work out what should be built or changed".to_string(),
        "2. **Implement it** - write the code for the requested functionality".to_string(),
        "3. **Open a Merge Request** - push the work to a branch and create an MR".to_string(),
        "4. **Provide a Preview URL** - point at a demo environment when one applies".to_string(),
        "5. **Reply in Slack** - post the results back to the originating thread".to_string(),
        String::new(),
        "## Git Workflow Before the MR".to_string(),
        "1. Stash local changes if there are any: 'git stash'".to_string(),
        "2. Check whether an MR already exists for the Jira ticket:".to_string(),
        format!("   - MR exists: 'git checkout {branch_pattern}' and pull the latest changes"),
        format!("   - No MR yet: 'git checkout {target_branch}' and create a new branch from it"),
        "3. Pull the latest changes: 'git pull'".to_string(),
        String::new(),
        "## Commit Message Format".to_string(),
        "- Every commit message must read: '[AI generated] [<jira-ticket-id>] <short-description>'".to_string(),
        "- Example: '[AI generated] [CRO-123] Add user authentication system'".to_string(),
        String::new(),
        "## Project Details".to_string(),
        format!("- Project URL: {project_url}"),
        format!("- Project ID: {project_id}"),
        String::new(),
        "## Branch Naming".to_string(),
        format!("- Branch name format: '{branch_pattern}'"),
        "- {jira-ticket-id} is the Jira ticket id found in the message".to_string(),
        String::new(),
        "## Preview URL".to_string(),
        "- When the message references a demo page, include the Preview URL in the final response".to_string(),
        format!("- Format: 🌐 **Preview URL**: '{demo_base_url}[pathname of the URL from the message]'"),
        String::new(),
        "## GitLab MR Requirements".to_string(),
        "- **NEVER** call update_merge_request; only create_merge_request is allowed for new MRs".to_string(),
        "- **title**: [AI generated] [<jira-ticket-id>] <short-description>".to_string(),
        "- **description**: sections '## 🚀 Preview URL', '## 📝 Changes Summary', '## 🎯 Jira Ticket', '## Slack Thread'".to_string(),
        format!("- **labels**: {}", config.render_labels()),
        "- **assignee_ids**: keep the assignee named in the opening thread message (\"Please wait, @{assignee-user-name} will handle your request soon\"), converted to a GitLab user id; otherwise assign the person who mentioned the bot".to_string(),
        format!("- **target_branch**: {target_branch}"),
        String::new(),
        "## Response Format".to_string(),
        "When the task is done you MUST reply with the slack_reply_to_thread tool, using the exact channel_id and thread_ts values given at the end of the message.".to_string(),
        String::new(),
        "## Final Response Template".to_string(),
        "✨ MR Created Successfully ✨".to_string(),
        String::new(),
        "🎯 **Summary**".to_string(),
        "Short description of what was implemented".to_string(),
        String::new(),
        "🔗 **Merge Request**".to_string(),
        "[Direct link to the MR with descriptive text]".to_string(),
        String::new(),
        "🌐 **Preview URL**".to_string(),
        "[Preview URL] (available once the MR pipeline succeeds)".to_string(),
        String::new(),
        "## Important Notes".to_string(),
        "- Always reply to the original Slack thread".to_string(),
        "- Include working links to the MR and the demo".to_string(),
        "- Keep the response concise but informative".to_string(),
        "- If something fails, explain what went wrong and the next steps".to_string(),
    ];
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{render_instruction_template, InstructionConfig, DEFAULT_MR_LABEL};

    #[test]
    fn functional_render_instruction_template_embeds_configured_values() {
        let config = InstructionConfig {
            target_branch: Some("develop".to_string()),
            project_url: Some("https://gitlab.example.com/team/app".to_string()),
            project_id: Some("4242".to_string()),
            demo_base_url: Some("https://demo.example.com".to_string()),
            extra_labels: vec!["team::web".to_string()],
            branch_prefix: "bot.relay/".to_string(),
        };
        let rendered = render_instruction_template(&config);
        assert!(rendered.contains("'git checkout develop'"));
        assert!(rendered.contains("- Project URL: https://gitlab.example.com/team/app"));
        assert!(rendered.contains("- Project ID: 4242"));
        assert!(rendered.contains("'https://demo.example.com[pathname"));
        assert!(rendered.contains("['ai-assisted::cursor-ai', 'team::web']"));
        assert!(rendered.contains("'bot.relay/{jira-ticket-id}'"));
        assert!(!rendered.contains("not configured"));
    }

    #[test]
    fn functional_render_instruction_template_uses_placeholders_when_unset() {
        let rendered = render_instruction_template(&InstructionConfig::default());
        assert!(rendered.contains("<not configured: GITLAB_MR_TARGET_BRANCH>"));
        assert!(rendered.contains("<not configured: GITLAB_PROJECT_URL>"));
        assert!(rendered.contains("<not configured: SAMPLE_DEMO_URL>"));
        assert!(rendered.contains(&format!("['{DEFAULT_MR_LABEL}']")));
        assert!(rendered.contains("'bot/{jira-ticket-id}'"));
    }

    #[test]
    fn regression_render_labels_skips_blank_and_duplicate_labels() {
        let config = InstructionConfig {
            extra_labels: vec![
                " ".to_string(),
                DEFAULT_MR_LABEL.to_string(),
                "qa".to_string(),
                "qa".to_string(),
            ],
            ..InstructionConfig::default()
        };
        assert_eq!(config.render_labels(), "['ai-assisted::cursor-ai', 'qa']");
    }

    #[test]
    fn unit_render_instruction_template_is_deterministic() {
        let config = InstructionConfig::default();
        assert_eq!(
            render_instruction_template(&config),
            render_instruction_template(&config)
        );
    }
}
