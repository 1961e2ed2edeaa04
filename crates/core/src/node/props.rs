use crate::acl::Acl;
use crate::error::{DavError, Result};
use crate::metadata::now_millis;
use crate::path::PathLevel;
use crate::privilege::PrivilegeScope;
use crate::response::{DavResponse, PropPatch, PropPatchResult, PropStatus, Status};

use super::{ResourceNode, Tree};

/// Property keys are `localName@namespace` with both parts present
fn validate_property_key(key: &str) -> Result<()> {
    match key.split_once('@') {
        Some((local, ns)) if !local.is_empty() && !ns.is_empty() => Ok(()),
        _ => Err(DavError::InvalidName(key.to_string())),
    }
}

impl ResourceNode {
    /// Privilege forest ACLs on this node are checked against
    pub fn privilege_scope(&self) -> PrivilegeScope {
        match self.path.level() {
            PathLevel::Cell => PrivilegeScope::Cell,
            PathLevel::Box | PathLevel::Dav => PrivilegeScope::Box,
        }
    }

    /// Default base for relative role hrefs: the role namespace of the box,
    /// or `__` for cell-level ACLs
    pub fn role_base(&self, tree: &Tree) -> String {
        let box_segment = self.path.box_name().unwrap_or("__");
        let mut url = tree.unit().clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(self.path.cell_name())
                .push("__role")
                .push(box_segment)
                .push("");
        }
        url.to_string()
    }

    pub fn proppatch(&mut self, tree: &Tree, patch: &PropPatch) -> Result<PropPatchResult> {
        for key in patch.set.keys().chain(patch.remove.iter()) {
            validate_property_key(key)?;
        }

        let _lock = self.lock(tree)?;
        self.load(tree)?;

        let sidecar = tree.metadata_file(&self.dir);
        let metadata = self.require_metadata_mut()?;
        let mut results = Vec::with_capacity(patch.set.len() + patch.remove.len());
        for (key, value) in &patch.set {
            metadata.properties.insert(key.clone(), value.clone());
            results.push((key.clone(), PropStatus::Ok));
        }
        for key in &patch.remove {
            let status = match metadata.properties.remove(key) {
                Some(_) => PropStatus::Ok,
                None => PropStatus::NotFound,
            };
            results.push((key.clone(), status));
        }
        metadata.updated = now_millis();
        sidecar.save(metadata)?;
        let etag = metadata.etag();

        tracing::info!(path = %self.path, changed = results.len(), "properties patched");
        Ok(PropPatchResult { etag, results })
    }

    /// Replace the ACL. Names are validated against this node's forest
    /// before anything is locked.
    pub fn set_acl(&mut self, tree: &Tree, mut acl: Acl) -> Result<DavResponse> {
        acl.validate(self.privilege_scope())?;
        if acl.base.is_none() {
            acl.base = Some(self.role_base(tree));
        }

        let _lock = self.lock(tree)?;
        self.load(tree)?;

        let sidecar = tree.metadata_file(&self.dir);
        let metadata = self.require_metadata_mut()?;
        metadata.acl = Some(acl);
        metadata.updated = now_millis();
        sidecar.save(metadata)?;
        let etag = metadata.etag();

        tracing::info!(path = %self.path, "acl replaced");
        Ok(DavResponse::new(Status::Ok, etag))
    }

    /// Cell nodes lock the cell, everything below a box locks the box
    fn lock<'t>(&self, tree: &'t Tree) -> Result<crate::lock::LockGuard<'t>> {
        match self.path.level() {
            PathLevel::Cell => tree.lock_cell(self.path.cell_name()),
            PathLevel::Box | PathLevel::Dav => tree.lock_dav(&self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_keys() {
        assert!(validate_property_key("title@urn:x-example").is_ok());
        assert!(validate_property_key("title").is_err());
        assert!(validate_property_key("@ns").is_err());
        assert!(validate_property_key("local@").is_err());
    }
}
