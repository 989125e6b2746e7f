//! Rule id → documentation URL.
//!
//! Core rules (`no-undef`) live on eslint.org; plugin rules (`react/jsx-key`)
//! resolve through a table of known plugins. Anything else points at the page
//! explaining how to add a plugin to the table.

const CORE_RULE_BASE: &str = "https://eslint.org/docs/rules/";

const UNKNOWN_RULE_URL: &str =
    "https://github.com/jfmengels/eslint-rule-documentation/blob/master/contributing.md";

/// Known plugins: (plugin name, URL prefix, URL suffix).
const PLUGINS: &[(&str, &str, &str)] = &[
    (
        "angular",
        "https://github.com/Gillespie59/eslint-plugin-angular/blob/master/docs/",
        ".md",
    ),
    (
        "ava",
        "https://github.com/avajs/eslint-plugin-ava/blob/master/docs/rules/",
        ".md",
    ),
    (
        "flowtype",
        "https://github.com/gajus/eslint-plugin-flowtype#eslint-plugin-flowtype-rules-",
        "",
    ),
    (
        "import",
        "https://github.com/benmosher/eslint-plugin-import/blob/master/docs/rules/",
        ".md",
    ),
    (
        "jsx-a11y",
        "https://github.com/evcohen/eslint-plugin-jsx-a11y/blob/master/docs/rules/",
        ".md",
    ),
    (
        "lodash",
        "https://github.com/wix/eslint-plugin-lodash/blob/master/docs/rules/",
        ".md",
    ),
    (
        "mocha",
        "https://github.com/lo1tuma/eslint-plugin-mocha/blob/master/docs/rules/",
        ".md",
    ),
    (
        "node",
        "https://github.com/mysticatea/eslint-plugin-node/blob/master/docs/rules/",
        ".md",
    ),
    (
        "promise",
        "https://github.com/xjamundx/eslint-plugin-promise#",
        "",
    ),
    (
        "react",
        "https://github.com/yannickcr/eslint-plugin-react/blob/master/docs/rules/",
        ".md",
    ),
    (
        "unicorn",
        "https://github.com/sindresorhus/eslint-plugin-unicorn/blob/master/docs/rules/",
        ".md",
    ),
];

/// Where a rule is documented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDocs {
    pub url: String,
    /// False when the rule's plugin is unknown and `url` is the fallback page.
    pub found: bool,
}

#[must_use]
pub fn rule_docs(rule_id: &str) -> RuleDocs {
    match rule_id.rsplit_once('/') {
        None => RuleDocs {
            url: format!("{CORE_RULE_BASE}{rule_id}"),
            found: true,
        },
        Some((plugin, rule)) => {
            let plugin = plugin.strip_prefix("eslint-plugin-").unwrap_or(plugin);
            PLUGINS
                .iter()
                .find(|(name, _, _)| *name == plugin)
                .map_or_else(
                    || RuleDocs {
                        url: UNKNOWN_RULE_URL.to_string(),
                        found: false,
                    },
                    |(_, prefix, suffix)| RuleDocs {
                        url: format!("{prefix}{rule}{suffix}"),
                        found: true,
                    },
                )
        }
    }
}
