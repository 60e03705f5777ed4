/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Only offered in admin mode
  pub admin: bool,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "attendance",
    aliases: &["a", "att"],
    description: "My attendance records",
    admin: false,
  },
  Command {
    name: "holidays",
    aliases: &["h", "hol", "vacation"],
    description: "My holiday requests",
    admin: false,
  },
  Command {
    name: "permissions",
    aliases: &["p", "perm", "leave"],
    description: "My permission requests",
    admin: false,
  },
  Command {
    name: "history",
    aliases: &["log", "changes"],
    description: "Attendance modification history",
    admin: false,
  },
  Command {
    name: "profile",
    aliases: &["me"],
    description: "Edit my profile",
    admin: false,
  },
  Command {
    name: "team",
    aliases: &["t", "overview"],
    description: "Team attendance overview",
    admin: true,
  },
  Command {
    name: "holiday-approvals",
    aliases: &["ha", "approve-holidays"],
    description: "Approve holiday requests",
    admin: true,
  },
  Command {
    name: "permission-approvals",
    aliases: &["pa", "approve-permissions"],
    description: "Approve permission requests",
    admin: true,
  },
  Command {
    name: "invites",
    aliases: &["i", "invite", "rsvp"],
    description: "Invite codes and RSVPs",
    admin: true,
  },
  Command {
    name: "mode",
    aliases: &["m", "switch"],
    description: "Toggle personal/admin dashboard",
    admin: false,
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Log out and clear cached data",
    admin: false,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit rollcall",
    admin: false,
  },
];

/// Look up a command by exact name or alias
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input.
///
/// Admin commands are left out unless `admin` is set.
pub fn get_suggestions(input: &str, admin: bool) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();
  let available = COMMANDS.iter().filter(|cmd| admin || !cmd.admin);

  if input_lower.is_empty() {
    return available.collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in available {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all_for_admin() {
    let suggestions = get_suggestions("", true);
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_admin_commands_hidden_in_personal_mode() {
    let suggestions = get_suggestions("", false);
    assert!(suggestions.iter().all(|cmd| !cmd.admin));
    assert!(get_suggestions("team", false).is_empty());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("holidays", false);
    assert_eq!(suggestions[0].name, "holidays");
  }

  #[test]
  fn test_alias_beats_prefix() {
    // "h" is an alias of holidays and a prefix of history
    let suggestions = get_suggestions("h", false);
    assert_eq!(suggestions[0].name, "holidays");
    assert!(suggestions.iter().any(|cmd| cmd.name == "history"));
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("perm", true);
    assert_eq!(suggestions[0].name, "permissions");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("approv", true);
    assert!(suggestions.iter().any(|cmd| cmd.name == "holiday-approvals"));
    assert!(suggestions.iter().any(|cmd| cmd.name == "permission-approvals"));
  }

  #[test]
  fn test_find_by_alias() {
    assert_eq!(find("PA").map(|c| c.name), Some("permission-approvals"));
    assert_eq!(find("exit").map(|c| c.name), Some("quit"));
    assert!(find("nope").is_none());
  }
}
