use crate::rows::{ActivityState, ResearchContentRow};
use crate::{ChainError, ServiceRegistry};
use chrono::{DateTime, Duration, Utc};
use meridian_protocol::ResearchContentType;
use meridian_store::key;
use meridian_types::config::{ACTIVITY_WINDOW_FINAL_SECS, ACTIVITY_WINDOW_INTERMEDIATE_SECS};
use meridian_types::{AccountName, ResearchContentId, ResearchId};
use std::collections::BTreeSet;
use tracing::info;

pub struct ContentService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl ContentService<'_> {
    pub fn get(&self, id: ResearchContentId) -> Result<ResearchContentRow, ChainError> {
        Ok(self.reg.research_contents.get(id)?.clone())
    }

    pub fn contents_of_research(
        &self,
        research: ResearchId,
    ) -> Result<Vec<ResearchContentRow>, ChainError> {
        Ok(self
            .reg
            .research_contents
            .range_prefix("by_research", &key![research.0])?
            .cloned()
            .collect())
    }

    /// Publish content under a research. References must point at existing
    /// content of *other* researches; the activity window length follows
    /// the content type.
    pub fn create_content(
        &mut self,
        research: ResearchId,
        content_type: ResearchContentType,
        title: &str,
        content: &str,
        authors: &[AccountName],
        references: &[ResearchContentId],
    ) -> Result<ResearchContentId, ChainError> {
        self.reg.researches.get(research)?;
        for author in authors {
            self.reg.accounts().check_existence(author)?;
        }
        for reference in references {
            let referenced = self.reg.research_contents.get(*reference)?;
            if referenced.research_id == research {
                return Err(ChainError::InvalidReference(
                    "content cannot reference its own research",
                ));
            }
        }

        let now = self.reg.clock.head_block_time;
        let window = match content_type {
            ResearchContentType::FinalResult => ACTIVITY_WINDOW_FINAL_SECS,
            _ => ACTIVITY_WINDOW_INTERMEDIATE_SECS,
        };
        let id = self.reg.research_contents.insert(|id| ResearchContentRow {
            id,
            research_id: research,
            content_type,
            title: title.to_owned(),
            content: content.to_owned(),
            authors: authors.iter().cloned().collect::<BTreeSet<_>>(),
            references: references.to_vec(),
            created_at: now,
            activity_window_start: now,
            activity_window_end: now + Duration::seconds(window),
            activity_state: ActivityState::Active,
        })?;
        info!(research = research.0, content = id.0, "research content published");
        Ok(id)
    }

    /// Active content in a research, ascending by id.
    pub fn active_contents_of_research(
        &self,
        research: ResearchId,
    ) -> Result<Vec<ResearchContentRow>, ChainError> {
        Ok(self
            .contents_of_research(research)?
            .into_iter()
            .filter(|c| c.activity_state == ActivityState::Active)
            .collect())
    }

    /// Close every activity window that ended at or before `now`,
    /// distributing the content's reward pools as each closes.
    pub fn close_due_windows(&mut self, now: DateTime<Utc>) -> Result<usize, ChainError> {
        let due: Vec<_> = self
            .reg
            .research_contents
            .range_prefix("by_activity_end", &key![false])?
            .take_while(|c| c.activity_window_end <= now)
            .map(|c| c.id)
            .collect();
        for id in &due {
            self.reg.rewards().distribute_content_pools(*id)?;
            self.reg
                .research_contents
                .update(*id, |row| row.activity_state = ActivityState::Closed)?;
        }
        Ok(due.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registry_with_research, ALICE};
    use meridian_types::AccountName;

    #[test]
    fn final_result_gets_the_long_window() {
        let (mut reg, _group, research) = registry_with_research(ALICE);
        let alice = AccountName::from(ALICE);
        let id = reg
            .contents()
            .create_content(
                research,
                ResearchContentType::FinalResult,
                "Results",
                "the data",
                &[alice],
                &[],
            )
            .unwrap();
        let row = reg.contents().get(id).unwrap();
        let len = (row.activity_window_end - row.activity_window_start).num_seconds();
        assert_eq!(len, ACTIVITY_WINDOW_FINAL_SECS);
    }

    #[test]
    fn self_reference_is_rejected() {
        let (mut reg, _group, research) = registry_with_research(ALICE);
        let alice = AccountName::from(ALICE);
        let first = reg
            .contents()
            .create_content(
                research,
                ResearchContentType::Milestone,
                "M1",
                "data",
                &[alice.clone()],
                &[],
            )
            .unwrap();
        let err = reg
            .contents()
            .create_content(
                research,
                ResearchContentType::Milestone,
                "M2",
                "data",
                &[alice],
                &[first],
            )
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidReference(_)));
    }

    #[test]
    fn window_close_flips_activity_state() {
        let (mut reg, _group, research) = registry_with_research(ALICE);
        let alice = AccountName::from(ALICE);
        let id = reg
            .contents()
            .create_content(
                research,
                ResearchContentType::Announcement,
                "A",
                "data",
                &[alice],
                &[],
            )
            .unwrap();

        let end = reg.contents().get(id).unwrap().activity_window_end;
        let closed = reg.contents().close_due_windows(end).unwrap();
        assert_eq!(closed, 1);
        assert_eq!(
            reg.contents().get(id).unwrap().activity_state,
            ActivityState::Closed
        );
        // a second sweep finds nothing
        assert_eq!(reg.contents().close_due_windows(end).unwrap(), 0);
    }
}
