use cinder_shared::errors::{AppError, AppResult, ErrorCode};
use cinder_shared::types::id;

use crate::models::{
    AuditReport, PairCheck, PairFixReport, PairSide, RefFinding, RefStatus, RepairReport,
};
use crate::store::Store;

/// Read-only consistency check of one user's match bookkeeping: every entry
/// in `match_refs` is resolved and classified, and the ledger is scanned for
/// active records naming the user that the list is missing.
pub async fn audit(store: &dyn Store, user_id: &str) -> AppResult<AuditReport> {
    id::require_well_formed(user_id, "user_id")?;
    let profile = store
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let mut findings = Vec::new();
    let mut issues = Vec::new();

    for match_id in &profile.match_refs {
        let finding = classify_ref(store, user_id, match_id).await?;
        if finding.status != RefStatus::Valid {
            issues.push(finding.note.clone());
        }
        findings.push(finding);
    }

    // Ledger records naming the user that the profile does not reference.
    let mut orphaned = Vec::new();
    for record in store.matches_naming(user_id).await? {
        if record.is_active() && !profile.match_refs.contains(&record.id) {
            issues.push(format!(
                "match {} names user {user_id} but is missing from their match list (orphaned)",
                record.id
            ));
            orphaned.push(record.id);
        }
    }

    let healthy = findings.iter().all(|f| f.status == RefStatus::Valid) && orphaned.is_empty();
    let recommendation = if healthy {
        None
    } else if findings.iter().any(|f| f.status == RefStatus::NotReciprocated) {
        Some(format!(
            "run repair for user {user_id}, then fix the reported matches from the counterpart side"
        ))
    } else {
        Some(format!("run repair for user {user_id}"))
    };

    Ok(AuditReport {
        user_id: user_id.to_string(),
        healthy,
        findings,
        orphaned,
        issues,
        recommendation,
    })
}

async fn classify_ref(store: &dyn Store, user_id: &str, match_id: &str) -> AppResult<RefFinding> {
    let Some(record) = store.get_match(match_id).await? else {
        return Ok(RefFinding {
            match_id: match_id.to_string(),
            status: RefStatus::RecordMissing,
            counterpart_id: None,
            note: format!("match {match_id} is referenced by {user_id} but does not exist"),
        });
    };

    if !record.is_active() {
        return Ok(RefFinding {
            match_id: match_id.to_string(),
            status: RefStatus::RecordDissolved,
            counterpart_id: None,
            note: format!("match {match_id} was dissolved but {user_id} still references it"),
        });
    }

    let two_distinct = record.users.len() == 2 && record.users[0] != record.users[1];
    let counterpart = if two_distinct {
        record.counterpart_of(user_id).map(str::to_string)
    } else {
        None
    };
    let Some(counterpart_id) = counterpart else {
        return Ok(RefFinding {
            match_id: match_id.to_string(),
            status: RefStatus::MalformedUsers,
            counterpart_id: None,
            note: format!(
                "match {match_id} does not name {user_id} plus exactly one other user"
            ),
        });
    };

    let Some(counterpart_profile) = store.get_profile(&counterpart_id).await? else {
        return Ok(RefFinding {
            match_id: match_id.to_string(),
            status: RefStatus::CounterpartMissing,
            counterpart_id: Some(counterpart_id.clone()),
            note: format!(
                "match {match_id} names {counterpart_id}, whose profile no longer exists"
            ),
        });
    };

    if !counterpart_profile.match_refs.iter().any(|m| m == match_id) {
        return Ok(RefFinding {
            match_id: match_id.to_string(),
            status: RefStatus::NotReciprocated,
            counterpart_id: Some(counterpart_id.clone()),
            note: format!(
                "match {match_id} is valid but {counterpart_id} does not reference it back"
            ),
        });
    }

    Ok(RefFinding {
        match_id: match_id.to_string(),
        status: RefStatus::Valid,
        counterpart_id: Some(counterpart_id),
        note: format!("match {match_id} is consistent"),
    })
}

/// Mutating counterpart of [`audit`]. Conservative by design: it only grows
/// or shrinks this user's own `match_refs`. Records whose counterpart
/// profile is gone are tombstoned, never hard-deleted, so match history
/// survives and a second audit comes back clean. Asymmetries are left for a
/// `fix_pair` run on the other side.
pub async fn repair(store: &dyn Store, user_id: &str) -> AppResult<RepairReport> {
    let report = audit(store, user_id).await?;

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut dissolved = Vec::new();
    let mut remaining_issues = Vec::new();

    for match_id in &report.orphaned {
        if store.add_match_ref(user_id, match_id).await? {
            added.push(match_id.clone());
        }
    }

    for finding in &report.findings {
        match finding.status {
            RefStatus::Valid => {}
            RefStatus::RecordMissing | RefStatus::MalformedUsers | RefStatus::RecordDissolved => {
                if store.remove_match_ref(user_id, &finding.match_id).await? {
                    removed.push(finding.match_id.clone());
                }
            }
            RefStatus::CounterpartMissing => {
                store.remove_match_ref(user_id, &finding.match_id).await?;
                store.dissolve_match(&finding.match_id).await?;
                dissolved.push(finding.match_id.clone());
            }
            RefStatus::NotReciprocated => {
                remaining_issues.push(format!(
                    "match {} must be fixed from user {}'s side",
                    finding.match_id,
                    finding.counterpart_id.as_deref().unwrap_or("unknown"),
                ));
            }
        }
    }

    tracing::info!(
        user_id,
        added = added.len(),
        removed = removed.len(),
        dissolved = dissolved.len(),
        "repair completed"
    );

    Ok(RepairReport {
        user_id: user_id.to_string(),
        added,
        removed,
        dissolved,
        remaining_issues,
    })
}

/// Per-side view of a single match record's symmetry.
pub async fn check_pair(store: &dyn Store, match_id: &str) -> AppResult<PairCheck> {
    id::require_well_formed(match_id, "match_id")?;
    let record = store
        .get_match(match_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    let mut distinct_users: Vec<&String> = record.users.iter().collect();
    distinct_users.sort();
    distinct_users.dedup();
    let malformed_users = distinct_users.len() != 2;

    let mut sides = Vec::new();
    for user_id in &record.users {
        if sides.iter().any(|s: &PairSide| &s.user_id == user_id) {
            continue;
        }
        let profile = store.get_profile(user_id).await?;
        let has_back_ref = profile
            .as_ref()
            .map_or(false, |p| p.match_refs.iter().any(|m| m == match_id));
        sides.push(PairSide {
            user_id: user_id.clone(),
            profile_exists: profile.is_some(),
            has_back_ref,
        });
    }

    let symmetric =
        !malformed_users && sides.iter().all(|s| s.profile_exists && s.has_back_ref);

    Ok(PairCheck {
        match_id: record.id,
        active: record.dissolved_at.is_none(),
        malformed_users,
        sides,
        symmetric,
    })
}

/// Narrow repair for one (match, user) pair: union the user into the
/// record's `users` set and the match id into the user's `match_refs`.
pub async fn fix_pair(store: &dyn Store, match_id: &str, user_id: &str) -> AppResult<PairFixReport> {
    id::require_well_formed(match_id, "match_id")?;
    id::require_well_formed(user_id, "user_id")?;

    store
        .get_match(match_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
    store
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let added_to_record = store.add_match_user(match_id, user_id).await?;
    let added_back_ref = store.add_match_ref(user_id, match_id).await?;

    tracing::info!(match_id, user_id, added_to_record, added_back_ref, "pair fixed");

    Ok(PairFixReport {
        match_id: match_id.to_string(),
        user_id: user_id.to_string(),
        added_to_record,
        added_back_ref,
    })
}
