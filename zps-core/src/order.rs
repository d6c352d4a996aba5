// zps-core/src/order.rs
use std::path::PathBuf;

use tracing::{debug, warn};
use zps_common::manifest::PluginKind;
use zps_common::model::ResolvedPlugin;

use crate::scan::{scan, DirListing};

/// Slugs forced to load after everything else, in this order.
pub const TAIL_SLUGS: &[&str] = &[
    "zsh-users__zsh-autosuggestions",
    "zsh-users__zsh-syntax-highlighting",
];

/// What the shell needs: source order and the fpath block to prepend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPlan {
    pub source_order: Vec<ResolvedPlugin>,
    pub fpath_dirs: Vec<PathBuf>,
}

fn tail_rank(slug: &str) -> Option<usize> {
    TAIL_SLUGS.iter().position(|t| *t == slug)
}

/// Completion directories one fpath plugin contributes. A tree that cannot
/// be listed contributes nothing and logs a warning.
pub fn plugin_fpath_dirs(plugin: &ResolvedPlugin, listing: &dyn DirListing) -> Vec<PathBuf> {
    match scan(
        listing,
        &plugin.published_path,
        plugin.spec.fpath_dirs.as_deref(),
    ) {
        Ok(dirs) => {
            debug!("[{}] fpath dirs: {:?}", plugin.slug, dirs);
            dirs
        }
        Err(e) => {
            warn!("[{}] Skipping fpath scan: {}", plugin.slug, e);
            Vec::new()
        }
    }
}

/// Orders source plugins (sorted by slug, tail slugs last) and collects
/// completion directories of fpath plugins in input order.
pub fn plan(resolved: &[ResolvedPlugin], listing: &dyn DirListing) -> LoadPlan {
    let (sources, fpaths): (Vec<&ResolvedPlugin>, Vec<&ResolvedPlugin>) = resolved
        .iter()
        .partition(|p| p.kind() == PluginKind::Source);

    let (mut tail, mut normal): (Vec<&ResolvedPlugin>, Vec<&ResolvedPlugin>) =
        sources.into_iter().partition(|p| tail_rank(&p.slug).is_some());
    normal.sort_by(|a, b| a.slug.cmp(&b.slug));
    tail.sort_by_key(|p| tail_rank(&p.slug));

    let source_order: Vec<ResolvedPlugin> =
        normal.into_iter().chain(tail).cloned().collect();

    let fpath_dirs: Vec<PathBuf> = fpaths
        .into_iter()
        .flat_map(|p| plugin_fpath_dirs(p, listing))
        .collect();

    LoadPlan {
        source_order,
        fpath_dirs,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use zps_common::config::Config;
    use zps_common::manifest::parse;
    use zps_common::model::RevState;

    use super::*;
    use crate::resolve::plan_targets;
    use crate::scan::memory::MemListing;

    fn resolved(doc: &str) -> Vec<ResolvedPlugin> {
        let cfg = Config::with_root("/r");
        plan_targets(&parse(doc.as_bytes()).unwrap(), &cfg)
            .unwrap()
            .into_iter()
            .map(|t| ResolvedPlugin {
                slug: t.slug,
                spec: t.spec,
                local_repo_path: t.repo_path,
                published_path: t.link_path,
                rev_state: RevState::TrackingBranch {
                    branch: "main".to_string(),
                },
                resolved_commit: "0123456789abcdef".to_string(),
            })
            .collect()
    }

    fn slugs(plan: &LoadPlan) -> Vec<&str> {
        plan.source_order.iter().map(|p| p.slug.as_str()).collect()
    }

    #[test]
    fn tail_plugin_moves_behind_normal_ones() {
        let r = resolved(
            r#"
[[plugins]]
repo = "zsh-users/zsh-autosuggestions"

[[plugins]]
repo = "olets/zsh-abbr"
"#,
        );
        let p = plan(&r, &MemListing::new());
        assert_eq!(slugs(&p), ["olets__zsh-abbr", "zsh-users__zsh-autosuggestions"]);
    }

    #[test]
    fn tail_block_follows_priority_list_for_any_input_order() {
        let docs = [
            "[[plugins]]\nrepo = \"zsh-users/zsh-syntax-highlighting\"\n[[plugins]]\nrepo = \"b/x\"\n[[plugins]]\nrepo = \"zsh-users/zsh-autosuggestions\"\n[[plugins]]\nrepo = \"a/y\"\n",
            "[[plugins]]\nrepo = \"zsh-users/zsh-autosuggestions\"\n[[plugins]]\nrepo = \"a/y\"\n[[plugins]]\nrepo = \"zsh-users/zsh-syntax-highlighting\"\n[[plugins]]\nrepo = \"b/x\"\n",
        ];
        for doc in docs {
            let p = plan(&resolved(doc), &MemListing::new());
            assert_eq!(
                slugs(&p),
                [
                    "a__y",
                    "b__x",
                    "zsh-users__zsh-autosuggestions",
                    "zsh-users__zsh-syntax-highlighting"
                ]
            );
        }
    }

    #[test]
    fn absent_tail_members_are_skipped() {
        let r = resolved(
            "[[plugins]]\nrepo = \"zsh-users/zsh-syntax-highlighting\"\n[[plugins]]\nrepo = \"c/z\"\n",
        );
        let p = plan(&r, &MemListing::new());
        assert_eq!(slugs(&p), ["c__z", "zsh-users__zsh-syntax-highlighting"]);
    }

    #[test]
    fn without_tail_members_order_is_alphabetical() {
        let r = resolved(
            r#"
[[plugins]]
repo = "ohmyzsh/ohmyzsh"
name = "copypath"

[[plugins]]
repo = "zdharma/fast"

[[plugins]]
repo = "ohmyzsh/ohmyzsh"
name = "clipboard"
"#,
        );
        let p = plan(&r, &MemListing::new());
        assert_eq!(slugs(&p), ["clipboard", "copypath", "zdharma__fast"]);
        assert!(p.fpath_dirs.is_empty());
    }

    #[test]
    fn fpath_dirs_concatenate_in_plugin_order() {
        let r = resolved(
            r#"
[[plugins]]
repo = "zsh-users/zsh-completions"
type = "fpath"
fpath_dirs = ["src"]

[[plugins]]
repo = "a/comp"
type = "fpath"

[[plugins]]
repo = "a/source"
"#,
        );
        let fs = MemListing::new()
            .link("/r/plugins/zsh-users__zsh-completions", "/r/repos/zsh-users__zsh-completions")
            .dir("/r/repos/zsh-users__zsh-completions", &["src/"])
            .dir("/r/repos/zsh-users__zsh-completions/src", &["README"])
            .link("/r/plugins/a__comp", "/r/repos/a__comp")
            .dir("/r/repos/a__comp", &["_root", "completions/", "docs/"])
            .dir("/r/repos/a__comp/completions", &["_comp"])
            .dir("/r/repos/a__comp/docs", &["_ignored"]);

        let p = plan(&r, &fs);
        assert_eq!(slugs(&p), ["a__source"]);
        assert_eq!(
            p.fpath_dirs,
            vec![
                Path::new("/r/repos/zsh-users__zsh-completions/src").to_path_buf(),
                Path::new("/r/repos/a__comp").to_path_buf(),
                Path::new("/r/repos/a__comp/completions").to_path_buf(),
            ]
        );
    }

    #[test]
    fn per_plugin_dirs_match_the_plan_block() {
        let r = resolved(
            "[[plugins]]\nrepo = \"a/comp\"\ntype = \"fpath\"\n[[plugins]]\nrepo = \"b/comp\"\ntype = \"fpath\"\n",
        );
        let fs = MemListing::new()
            .link("/r/plugins/a__comp", "/r/repos/a__comp")
            .dir("/r/repos/a__comp", &["functions/"])
            .dir("/r/repos/a__comp/functions", &["_a"])
            .link("/r/plugins/b__comp", "/r/repos/b__comp")
            .dir("/r/repos/b__comp", &["_b"]);

        let a = plugin_fpath_dirs(&r[0], &fs);
        let b = plugin_fpath_dirs(&r[1], &fs);
        assert_eq!(a, vec![Path::new("/r/repos/a__comp/functions").to_path_buf()]);
        assert_eq!(b, vec![Path::new("/r/repos/b__comp").to_path_buf()]);
        assert_eq!(plan(&r, &fs).fpath_dirs, [a, b].concat());
    }

    #[test]
    fn unscannable_fpath_plugin_contributes_nothing() {
        let r = resolved("[[plugins]]\nrepo = \"a/comp\"\ntype = \"fpath\"\n");
        let p = plan(&r, &MemListing::new());
        assert!(p.fpath_dirs.is_empty());
    }
}
