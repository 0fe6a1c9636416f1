use super::codes::render_padded;
use super::domain::{HierarchyLevel, WidthPolicy};
use super::RosterError;
use std::iter::FusedIterator;

/// One reserved student position within a school.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentSlot {
    /// 1-based position within the school.
    pub position: u64,
    /// Position zero-padded to the configured width.
    pub student_no: String,
    /// School code, two-digit grade, and student number concatenated.
    pub student_id: String,
}

/// Lazy sequence of the slots of one school, `1..=quota`.
///
/// Consumed once; expanding the school again means asking for a new sequence.
#[derive(Debug)]
pub struct StudentSlots<'a> {
    school_code: &'a str,
    grade_code: &'a str,
    width: usize,
    next: u64,
    quota: u64,
}

impl<'a> StudentSlots<'a> {
    /// Under [`WidthPolicy::Fail`] the largest position is checked before any
    /// slot is produced; under [`WidthPolicy::Widen`] long numbers are kept whole.
    pub fn new(
        school_code: &'a str,
        grade_code: &'a str,
        quota: u64,
        width: usize,
        policy: WidthPolicy,
    ) -> Result<Self, RosterError> {
        if quota > 0 {
            render_padded(quota, width, policy, HierarchyLevel::Student)?;
        }

        Ok(Self {
            school_code,
            grade_code,
            width,
            next: 1,
            quota,
        })
    }
}

impl Iterator for StudentSlots<'_> {
    type Item = StudentSlot;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.quota {
            return None;
        }

        let position = self.next;
        self.next += 1;
        let student_no = format!("{position:0width$}", width = self.width);
        let student_id = format!("{}{}{}", self.school_code, self.grade_code, student_no);

        Some(StudentSlot {
            position,
            student_no,
            student_id,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.quota.saturating_add(1).saturating_sub(self.next);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for StudentSlots<'_> {}

impl FusedIterator for StudentSlots<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_one_slot_per_position() {
        let slots: Vec<_> = StudentSlots::new("001", "01", 3, 3, WidthPolicy::Widen)
            .expect("slots")
            .collect();
        let numbers: Vec<_> = slots.iter().map(|slot| slot.student_no.as_str()).collect();
        assert_eq!(numbers, ["001", "002", "003"]);
        assert_eq!(slots[2].student_id, "00101003");
        assert_eq!(slots[0].position, 1);
    }

    #[test]
    fn zero_quota_is_empty() {
        let mut slots = StudentSlots::new("001", "01", 0, 3, WidthPolicy::Fail).expect("slots");
        assert_eq!(slots.len(), 0);
        assert!(slots.next().is_none());
    }

    #[test]
    fn positions_longer_than_width_are_not_truncated() {
        let slots: Vec<_> = StudentSlots::new("7", "02", 12, 1, WidthPolicy::Widen)
            .expect("widen accepts")
            .collect();
        assert_eq!(slots.len(), 12);
        assert_eq!(slots[8].student_no, "9");
        assert_eq!(slots[9].student_no, "10");
        assert_eq!(slots[11].student_no, "12");
        assert_eq!(slots[11].student_id, "70212");
    }

    #[test]
    fn fail_policy_rejects_before_producing_slots() {
        let err = StudentSlots::new("001", "01", 1000, 3, WidthPolicy::Fail)
            .expect_err("1000 needs four digits");
        assert!(matches!(
            err,
            RosterError::CodeWidthOverflow {
                level: HierarchyLevel::Student,
                needed: 4,
                width: 3,
                ..
            }
        ));
    }

    #[test]
    fn sequence_is_exhausted_after_one_pass() {
        let mut slots = StudentSlots::new("001", "01", 2, 2, WidthPolicy::Widen).expect("slots");
        assert_eq!(slots.size_hint(), (2, Some(2)));
        assert_eq!(slots.by_ref().count(), 2);
        assert!(slots.next().is_none());
        assert_eq!(slots.len(), 0);
    }
}
