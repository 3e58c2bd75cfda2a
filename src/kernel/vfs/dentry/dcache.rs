use alloc::collections::btree_map::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use eonix_sync::Spin;

use super::Dentry;

/// Key a dcache entry by the parent dentry's identity and the child name.
type Key = (usize, Arc<[u8]>);

static DCACHE: Spin<BTreeMap<Key, Arc<Dentry>>> = Spin::new(BTreeMap::new());

fn key_for(parent: &Arc<Dentry>, name: &[u8]) -> Key {
    (Arc::as_ptr(parent) as usize, Arc::from(name))
}

/// Insert `dentry` into the dentry cache, keyed by its parent and name.
pub fn d_add(dentry: Arc<Dentry>) {
    let key = key_for(dentry.parent(), dentry.name());
    DCACHE.lock().insert(key, dentry);
}

/// Look up a previously cached dentry named `name` under `parent`.
pub fn d_find(parent: &Arc<Dentry>, name: &[u8]) -> Option<Arc<Dentry>> {
    DCACHE.lock().get(&key_for(parent, name)).cloned()
}

/// Remove `dentry` from the cache so later lookups miss and revalidate.
pub fn d_remove(dentry: &Arc<Dentry>) {
    let key = key_for(dentry.parent(), dentry.name());
    DCACHE.lock().remove(&key);
}

/// Call `lookup()` on the parent's inode to try to populate `dentry`.
///
/// Silently does nothing on failure, leaving `dentry` negative.
pub async fn d_try_revalidate(dentry: &Arc<Dentry>) {
    let Ok(parent) = dentry.parent().get_inode() else {
        return;
    };

    if let Ok(Some(inode)) = parent.lookup(dentry).await {
        dentry.fill(inode);
    }
}

/// Move `old`'s cache slot so that `new` now owns it, dropping `old`'s own
/// slot. Used after a rename has already relinked the backing filesystem to
/// keep the cache from returning the stale path for the moved inode.
pub async fn d_exchange(old: &Arc<Dentry>, new: &Arc<Dentry>) {
    d_remove(old);
    d_remove(new);

    if let Some(inode) = old.inode() {
        new.fill(inode);
    }
    old.invalidate();

    d_add(new.clone());
}

fn cached_children(parent: &Arc<Dentry>) -> Vec<Arc<Dentry>> {
    let parent_ptr = Arc::as_ptr(parent) as usize;
    DCACHE
        .lock()
        .iter()
        .filter(|((ptr, _), _)| *ptr == parent_ptr)
        .map(|(_, dentry)| dentry.clone())
        .collect()
}

/// Walk the cached subtree rooted at `root`, dropping every negative dentry
/// found. Returns the number of entries removed.
///
/// Used by `lofs`'s `PRUNE` ioctl to release holds the overlay keeps on the
/// lower namespace through stale negative lookups.
pub fn prune_negative_under(root: &Arc<Dentry>) -> usize {
    let mut pruned = 0;
    let mut stack = cached_children(root);

    while let Some(dentry) = stack.pop() {
        if dentry.is_valid() {
            stack.extend(cached_children(&dentry));
        } else {
            d_remove(&dentry);
            pruned += 1;
        }
    }

    pruned
}
