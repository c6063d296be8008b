/*
 * Blocklaunch - A Minecraft Launcher
 * Copyright (C) 2025 Josh Kropf <josh@slashdev.ca>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use crate::{
    env::{self, Os},
    json::{OsProperties, Rule, RuleAction}
};

/// Host properties rules are evaluated against
#[derive(Clone, Debug)]
pub struct RulesContext {
    pub os: Os,
    pub arch: String,
    pub features: Vec<String>
}

impl RulesContext {
    pub fn new(os: Os, features: &[String]) -> Self {
        RulesContext {
            os,
            arch: env::get_host_arch().to_string(),
            features: features.to_vec()
        }
    }
}

impl Default for RulesContext {
    fn default() -> Self {
        RulesContext::new(Os::host(), &[])
    }
}

/// Library rule verdict.
///
/// Only two rule shapes are recognised. A lone `allow` bound to an os
/// applies everywhere except that os, and `allow` followed by `disallow`
/// for osx applies only on osx. Libraries without rules, and any other
/// shape, always apply.
pub fn library_applies(rules: &[Rule], ctx: &RulesContext) -> bool {
    match rules {
        [] => true,

        [only] => match (only.action, os_name(only)) {
            (RuleAction::Allow, Some(name)) => name != ctx.os.name(),
            _ => true
        },

        [first, second, ..] => {
            if first.action == RuleAction::Allow
                && second.action == RuleAction::Disallow
                && os_name(second) == Some("osx")
            {
                ctx.os == Os::Osx
            } else {
                true
            }
        }
    }
}

/// Verdict for a conditional argument entry.
///
/// Feature keyed rules need every referenced feature to be active. Os and
/// arch keyed rules are walked in order and the last matching rule wins.
pub fn argument_applies(rules: &[Rule], ctx: &RulesContext) -> bool {
    // rules "match" when rules list is empty
    if rules.is_empty() {
        return true;
    }

    let mut feature_keys = rules.iter()
        .filter_map(|r| r.features.as_ref())
        .flat_map(|f| f.keys())
        .peekable();

    if feature_keys.peek().is_some() {
        return feature_keys.all(|key| ctx.features.iter().any(|f| f == key));
    }

    let mut result = false;

    for rule in rules {
        if rule.os.as_ref().map_or(true, |os| os_matches(os, ctx)) {
            result = rule.action == RuleAction::Allow;
        }
    }

    result
}

fn os_name(rule: &Rule) -> Option<&str> {
    rule.os.as_ref().and_then(|os| os.name.as_deref())
}

fn os_matches(os: &OsProperties, ctx: &RulesContext) -> bool {
    os.name.as_ref().map_or(true, |v| v == ctx.os.name()) &&
    // os version regexes are ignored, every host version matches
    os.arch.as_ref().map_or(true, |v| v == &ctx.arch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn rule(action: RuleAction, os: Option<&str>) -> Rule {
        Rule {
            action,
            features: None,
            os: os.map(|name| OsProperties {
                name: Some(name.to_string()),
                version: None, arch: None
            })
        }
    }

    fn feature_rule(features: &[&str]) -> Rule {
        Rule {
            action: RuleAction::Allow,
            features: Some(features.iter().map(|f| (f.to_string(), true)).collect::<HashMap<_, _>>()),
            os: None
        }
    }

    fn ctx(os: Os, features: &[&str]) -> RulesContext {
        RulesContext {
            os,
            arch: "x86_64".to_string(),
            features: features.iter().map(|f| f.to_string()).collect()
        }
    }

    #[test]
    fn no_rules_always_apply() {
        assert!(library_applies(&[], &ctx(Os::Linux, &[])));
        assert!(library_applies(&[], &ctx(Os::Windows, &[])));
    }

    #[test]
    fn single_allow_os_applies_everywhere_else() {
        let rules = vec![rule(RuleAction::Allow, Some("osx"))];

        assert!(library_applies(&rules, &ctx(Os::Linux, &[])));
        assert!(library_applies(&rules, &ctx(Os::Windows, &[])));
        assert!(!library_applies(&rules, &ctx(Os::Osx, &[])));
    }

    #[test]
    fn allow_then_disallow_osx_applies_only_on_osx() {
        let rules = vec![
            rule(RuleAction::Allow, None),
            rule(RuleAction::Disallow, Some("osx"))
        ];

        assert!(library_applies(&rules, &ctx(Os::Osx, &[])));
        assert!(!library_applies(&rules, &ctx(Os::Linux, &[])));
        assert!(!library_applies(&rules, &ctx(Os::Windows, &[])));
    }

    #[test]
    fn other_shapes_apply() {
        let single_allow = vec![rule(RuleAction::Allow, None)];
        let single_disallow = vec![rule(RuleAction::Disallow, Some("linux"))];
        let disallow_windows = vec![
            rule(RuleAction::Allow, None),
            rule(RuleAction::Disallow, Some("windows"))
        ];

        assert!(library_applies(&single_allow, &ctx(Os::Linux, &[])));
        assert!(library_applies(&single_disallow, &ctx(Os::Linux, &[])));
        assert!(library_applies(&disallow_windows, &ctx(Os::Windows, &[])));
    }

    #[test]
    fn feature_rules_need_every_feature() {
        let rules = vec![feature_rule(&["has_custom_resolution", "is_demo_user"])];

        assert!(argument_applies(&rules, &ctx(Os::Linux, &["has_custom_resolution", "is_demo_user"])));
        assert!(!argument_applies(&rules, &ctx(Os::Linux, &["has_custom_resolution"])));
        assert!(!argument_applies(&rules, &ctx(Os::Linux, &[])));
    }

    #[test]
    fn os_argument_rules() {
        let osx_only = vec![rule(RuleAction::Allow, Some("osx"))];
        assert!(argument_applies(&osx_only, &ctx(Os::Osx, &[])));
        assert!(!argument_applies(&osx_only, &ctx(Os::Linux, &[])));

        let x86 = vec![Rule {
            action: RuleAction::Allow,
            features: None,
            os: Some(OsProperties { name: None, version: None, arch: Some("x86".to_string()) })
        }];
        assert!(!argument_applies(&x86, &ctx(Os::Windows, &[])));

        assert!(argument_applies(&[], &ctx(Os::Linux, &[])));
    }
}
