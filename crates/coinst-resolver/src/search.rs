use coinst_core::DepField;
use tracing::{debug, trace, warn};

use crate::frontier::{Frontier, NodeId};
use crate::types::{Installability, Verdict};
use crate::universe::{PackageId, PackageUniverse};

impl PackageUniverse {
    /// Can at least one of `roots` be installed together with everything it
    /// needs? Leaves every simulation counter as it found it. Only a positive
    /// answer is cached.
    pub(crate) fn check_installable(&mut self, roots: Vec<PackageId>) -> Installability {
        if roots.iter().any(|id| self.get(*id).verdict == Verdict::Yes) {
            return Installability::Installable;
        }
        if roots.is_empty() {
            return Installability::NotInstallable;
        }

        let mut frontier = Frontier::new(roots);
        let mut pointer = Some(frontier.head());
        let mut remaining = self.step_budget();

        while let Some(current) = pointer {
            if remaining == 0 {
                return self.abandon_search(&frontier);
            }
            remaining -= 1;

            if frontier.node(current).cursor.is_none() {
                self.enter_node(&mut frontier, current);
            } else {
                self.retry_node(&mut frontier, current);
            }

            self.skip_uninstallable(&mut frontier, current);

            let Some(chosen) = frontier.node(current).chosen() else {
                pointer = frontier.prev(current);
                continue;
            };

            self.install(chosen);
            if self.get(chosen).installed == 1 && !self.expand(&mut frontier, current, chosen) {
                // some dependency has no provider at all: try the next candidate
                continue;
            }

            pointer = frontier.next(current);
        }

        let head = frontier.head();
        let Some(root) = frontier.node(head).chosen() else {
            trace!(arch = %self.arch(), "installability search exhausted every candidate");
            self.release(&frontier, None);
            return Installability::NotInstallable;
        };

        debug_assert_ne!(self.get(root).verdict, Verdict::Yes);
        self.get_mut(root).verdict = Verdict::Yes;
        let root_name = self.get(root).package.name.clone();
        debug!(arch = %self.arch(), package = %root_name, "installable");
        self.release(&frontier, Some(&root_name));
        Installability::Installable
    }

    // First visit: prefer a candidate something else already pulled in.
    fn enter_node(&self, frontier: &mut Frontier, current: NodeId) {
        let tail = frontier.tail();
        let node = frontier.node(current);
        let cursor = if node.candidates.is_empty() {
            None
        } else {
            Some(
                node.candidates
                    .iter()
                    .position(|id| self.get(*id).installed > 0)
                    .unwrap_or(0),
            )
        };
        let node = frontier.node_mut(current);
        node.cursor = cursor;
        node.cutoff = Some(tail);
    }

    // Back here after something deeper failed: undo the current choice and
    // move on. A reused, already installed candidate is not the problem, so
    // there is nothing left to try at this node.
    fn retry_node(&mut self, frontier: &mut Frontier, current: NodeId) {
        let node = frontier.node(current);
        let (Some(index), Some(cutoff)) = (node.cursor, node.cutoff) else {
            return;
        };
        let chosen = node.candidates[index];
        let count = node.candidates.len();

        self.uninstall(chosen);
        frontier.trim_after(cutoff);

        let next = if self.get(chosen).installed > 0 || index + 1 >= count {
            None
        } else {
            Some(index + 1)
        };
        frontier.node_mut(current).cursor = next;
    }

    fn skip_uninstallable(&self, frontier: &mut Frontier, current: NodeId) {
        let node = frontier.node(current);
        let mut cursor = node.cursor;
        while let Some(index) = cursor {
            if self.can_install(node.candidates[index]) {
                break;
            }
            cursor = (index + 1 < node.candidates.len()).then_some(index + 1);
        }
        frontier.node_mut(current).cursor = cursor;
    }

    /// Splices the dependencies of a freshly installed package into the
    /// frontier. Returns false when some alternative group has no provider
    /// or only repeats a candidate this node already gave up on.
    fn expand(&mut self, frontier: &mut Frontier, current: NodeId, chosen: PackageId) -> bool {
        let package = std::sync::Arc::clone(&self.get(chosen).package);
        let expanded = frontier.node(current).expanded;
        let mut bother = true;

        for field in DepField::SOLVER {
            for group in package.depends(field).iter() {
                let matches = self.matching(group);
                match matches.len() {
                    0 => bother = false,
                    1 => {
                        let node = frontier.node(current);
                        let index = node.cursor.unwrap_or(0);
                        if node.candidates[..index].contains(&matches[0]) {
                            // X: A | B where B itself needs A; A already failed here
                            bother = false;
                            continue;
                        }
                        let (forced, cutoff) = (node.candidates.len() == 1, node.cutoff);
                        if forced {
                            if !expanded {
                                frontier.insert_after(current, matches);
                                frontier.node_mut(current).expanded = true;
                            }
                        } else if let Some(cutoff) = cutoff {
                            frontier.insert_after(cutoff, matches);
                        }
                    }
                    _ => {
                        let tail = frontier.tail();
                        frontier.insert_after(tail, matches);
                    }
                }
            }
        }

        bother
    }

    fn abandon_search(&mut self, frontier: &Frontier) -> Installability {
        let involved = frontier.chosen_from_tail().len();
        let root = frontier
            .node(frontier.head())
            .candidates
            .first()
            .map(|id| self.get(*id).package.name.clone())
            .unwrap_or_default();
        warn!(
            arch = %self.arch(),
            package = %root,
            involved,
            frontier = frontier.len(),
            "installability search ran out of steps"
        );
        self.release(frontier, None);
        Installability::BudgetExceeded
    }

    /// Uninstalls every chosen candidate. On success, records `root` as
    /// affected by each package this search installed for the first time.
    fn release(&mut self, frontier: &Frontier, root: Option<&str>) {
        for id in frontier.chosen_from_tail() {
            if let Some(root) = root {
                let collected = self.get_mut(id);
                if collected.installed == 1 {
                    collected.may_affect.insert(root.to_string());
                }
            }
            self.uninstall(id);
        }
    }
}
