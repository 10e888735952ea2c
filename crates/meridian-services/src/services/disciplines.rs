use crate::rows::DisciplineRow;
use crate::{ChainError, ServiceRegistry};
use meridian_store::{key, Row};
use meridian_types::{DisciplineId, Share};
use tracing::info;

pub struct DisciplineService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl DisciplineService<'_> {
    pub fn get(&self, id: DisciplineId) -> Result<DisciplineRow, ChainError> {
        Ok(self.reg.disciplines.get(id)?.clone())
    }

    pub fn get_by_name(&self, name: &str) -> Result<DisciplineRow, ChainError> {
        self.reg
            .disciplines
            .find_unique("by_name", &key![name])?
            .cloned()
            .ok_or_else(|| ChainError::not_found_by_key(DisciplineRow::ENTITY, name))
    }

    pub fn check_existence(&self, id: DisciplineId) -> Result<(), ChainError> {
        self.reg.disciplines.get(id)?;
        Ok(())
    }

    pub fn create_discipline(
        &mut self,
        name: &str,
        parent: Option<DisciplineId>,
    ) -> Result<DisciplineId, ChainError> {
        if self.reg.disciplines.find_unique("by_name", &key![name])?.is_some() {
            return Err(ChainError::already_exists(DisciplineRow::ENTITY, name));
        }
        if let Some(parent) = parent {
            self.check_existence(parent)?;
        }
        let id = self.reg.disciplines.insert(|id| DisciplineRow {
            id,
            name: name.to_owned(),
            parent,
            total_expertise_amount: 0,
            accumulated_reward: 0,
        })?;
        info!(discipline = name, "discipline created");
        Ok(id)
    }

    /// Children of a discipline, ascending by id.
    pub fn children(&self, parent: DisciplineId) -> Result<Vec<DisciplineRow>, ChainError> {
        Ok(self
            .reg
            .disciplines
            .range_prefix("by_parent", &key![true, parent.0])?
            .cloned()
            .collect())
    }

    /// Additive aggregate adjustment; callers keep per-token sums in sync.
    pub(crate) fn adjust_total_expertise(
        &mut self,
        id: DisciplineId,
        delta: Share,
    ) -> Result<(), ChainError> {
        self.reg
            .disciplines
            .update(id, |row| row.total_expertise_amount += delta)?;
        Ok(())
    }

    /// Park a fund allocation that found no active content.
    pub(crate) fn accumulate_reward(
        &mut self,
        id: DisciplineId,
        amount: Share,
    ) -> Result<(), ChainError> {
        self.reg
            .disciplines
            .update(id, |row| row.accumulated_reward += amount)?;
        Ok(())
    }

    /// Drain parked rewards for redistribution.
    pub(crate) fn take_accumulated_reward(&mut self, id: DisciplineId) -> Result<Share, ChainError> {
        let amount = self.reg.disciplines.get(id)?.accumulated_reward;
        if amount != 0 {
            self.reg
                .disciplines
                .update(id, |row| row.accumulated_reward = 0)?;
        }
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceRegistry;

    #[test]
    fn discipline_tree() {
        let mut reg = ServiceRegistry::genesis();
        let root = reg.disciplines().create_discipline("physics", None).unwrap();
        let child = reg
            .disciplines()
            .create_discipline("optics", Some(root))
            .unwrap();

        let children = reg.disciplines().children(root).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, child);

        let err = reg.disciplines().create_discipline("physics", None).unwrap_err();
        assert!(matches!(err, ChainError::AlreadyExists { .. }));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut reg = ServiceRegistry::genesis();
        let err = reg
            .disciplines()
            .create_discipline("optics", Some(DisciplineId(42)))
            .unwrap_err();
        assert!(matches!(err, ChainError::Store(_)));
    }
}
