const BUTTON_STYLE: &str = "display: inline-block; padding: 10px 20px; background: #2563eb; color: white; text-decoration: none; border-radius: 4px;";

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
{body}
</body>
</html>"#
    )
}

pub fn render_welcome(username: &str, base_url: &str) -> String {
    let username = escape(username);
    layout(&format!(
        r#"    <h2>Welcome to the CRM</h2>
    <p>Hi {username},</p>
    <p>Your organization has been created. Add agents and start tracking leads:</p>
    <p><a href="{base_url}/auth/login" style="{BUTTON_STYLE}">Log In</a></p>"#
    ))
}

pub fn render_password_reset(reset_url: &str) -> String {
    layout(&format!(
        r#"    <h2>Password Reset</h2>
    <p>A password reset was requested for your CRM account.</p>
    <p><a href="{reset_url}" style="{BUTTON_STYLE}">Reset Password</a></p>
    <p style="color: #666; font-size: 14px;">This link expires in 1 hour. If you didn't request this, you can ignore it.</p>"#
    ))
}

pub fn render_agent_invite(username: &str, organizer: &str, base_url: &str) -> String {
    let username = escape(username);
    let organizer = escape(organizer);
    layout(&format!(
        r#"    <h2>You are invited to be an agent</h2>
    <p>{organizer} added you as an agent with the username <strong>{username}</strong>.</p>
    <p>Choose a password to get started:</p>
    <p><a href="{base_url}/auth/forgot-password" style="{BUTTON_STYLE}">Set Password</a></p>"#
    ))
}

pub fn render_lead_created(lead_name: &str, lead_url: &str) -> String {
    let lead_name = escape(lead_name);
    layout(&format!(
        r#"    <h2>A lead has been created</h2>
    <p><strong>{lead_name}</strong> was added to your organization.</p>
    <p><a href="{lead_url}" style="{BUTTON_STYLE}">View Lead</a></p>"#
    ))
}
