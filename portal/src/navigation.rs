//! Drill-down navigation
//!
//! Tracks where a student is in the grade → subject → materials hierarchy.
//! Transitions are synchronous state swaps; fetching is driven by the caller
//! from the resulting state.

use crate::catalog::Grade;
use crate::error::{AppError, Result};
use serde::Serialize;

/// Position in the subject browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum NavState {
    #[default]
    Grades,
    Subjects { grade: Grade },
    Materials { grade: Grade, subject: &'static str },
}

impl NavState {
    pub fn grade(&self) -> Option<Grade> {
        match self {
            NavState::Grades => None,
            NavState::Subjects { grade } | NavState::Materials { grade, .. } => Some(*grade),
        }
    }

    pub fn subject(&self) -> Option<&'static str> {
        match self {
            NavState::Materials { subject, .. } => Some(subject),
            _ => None,
        }
    }

    /// Page heading for this position
    pub fn title(&self) -> String {
        match self {
            NavState::Grades => "Select Your Grade".to_string(),
            NavState::Subjects { grade } => format!("{} Grade Subjects", grade),
            NavState::Materials { grade, subject } => format!("{} - {} Grade", subject, grade),
        }
    }

    /// Breadcrumb labels from the root down to this position
    pub fn breadcrumb(&self) -> Vec<String> {
        let mut crumbs = vec!["Grades".to_string()];
        if let Some(grade) = self.grade() {
            crumbs.push(grade.to_string());
        }
        if let Some(subject) = self.subject() {
            crumbs.push(subject.to_string());
        }
        crumbs
    }
}

/// State machine over `NavState`
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    state: NavState,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Open a grade's subject list, dropping any selected subject
    pub fn select_grade(&mut self, grade: Grade) -> NavState {
        self.state = NavState::Subjects { grade };
        tracing::debug!("Navigated to {} subjects", grade);
        self.state
    }

    /// Open a subject's materials; requires a grade that offers the subject
    pub fn select_subject(&mut self, subject: &str) -> Result<NavState> {
        let Some(grade) = self.state.grade() else {
            return Err(AppError::Navigation(
                "Select a grade before choosing a subject".to_string(),
            ));
        };

        let subject = grade.subject(subject).ok_or_else(|| {
            AppError::Navigation(format!("{} is not taught in {} grade", subject, grade))
        })?;

        self.state = NavState::Materials { grade, subject };
        tracing::debug!("Navigated to {} materials for {}", subject, grade);
        Ok(self.state)
    }

    /// Step up one level; returns false when already at the grade list
    pub fn back(&mut self) -> bool {
        self.state = match self.state {
            NavState::Grades => return false,
            NavState::Subjects { .. } => NavState::Grades,
            NavState::Materials { grade, .. } => NavState::Subjects { grade },
        };
        true
    }

    /// Return to the grade list from anywhere
    pub fn reset(&mut self) {
        self.state = NavState::Grades;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_grades() {
        let nav = Navigator::new();
        assert_eq!(nav.state(), NavState::Grades);
        assert_eq!(nav.state().title(), "Select Your Grade");
    }

    #[test]
    fn test_drill_down_and_back() {
        for grade in Grade::ALL {
            let mut nav = Navigator::new();
            nav.select_grade(grade);
            nav.select_subject("Math").unwrap();
            assert_eq!(
                nav.state(),
                NavState::Materials {
                    grade,
                    subject: "Math"
                }
            );

            assert!(nav.back());
            assert_eq!(nav.state(), NavState::Subjects { grade });
            assert_eq!(nav.state().subject(), None);
            assert_eq!(nav.state().grade(), Some(grade));

            assert!(nav.back());
            assert_eq!(nav.state(), NavState::Grades);
            assert_eq!(nav.state().grade(), None);

            assert!(!nav.back());
            assert_eq!(nav.state(), NavState::Grades);
        }
    }

    #[test]
    fn test_subject_requires_grade() {
        let mut nav = Navigator::new();
        let err = nav.select_subject("Math").unwrap_err();
        assert!(matches!(err, AppError::Navigation(_)));
        assert_eq!(nav.state(), NavState::Grades);
    }

    #[test]
    fn test_subject_must_be_offered_in_grade() {
        let mut nav = Navigator::new();
        nav.select_grade(Grade::Eleventh);

        assert!(nav.select_subject("Technology").is_err());
        assert_eq!(nav.state(), NavState::Subjects { grade: Grade::Eleventh });
    }

    #[test]
    fn test_selecting_grade_clears_subject() {
        let mut nav = Navigator::new();
        nav.select_grade(Grade::Tenth);
        nav.select_subject("Technology").unwrap();

        nav.select_grade(Grade::Twelfth);
        assert_eq!(nav.state(), NavState::Subjects { grade: Grade::Twelfth });
        assert_eq!(nav.state().subject(), None);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut nav = Navigator::new();
        nav.select_grade(Grade::Twelfth);
        nav.select_subject("Philosophy").unwrap();

        nav.reset();
        assert_eq!(nav.state(), NavState::Grades);
    }

    #[test]
    fn test_titles_and_breadcrumbs() {
        let mut nav = Navigator::new();
        nav.select_grade(Grade::Tenth);
        assert_eq!(nav.state().title(), "10th Grade Subjects");
        assert_eq!(nav.state().breadcrumb(), vec!["Grades", "10th"]);

        nav.select_subject("History & Geography").unwrap();
        assert_eq!(nav.state().title(), "History & Geography - 10th Grade");
        assert_eq!(
            nav.state().breadcrumb(),
            vec!["Grades", "10th", "History & Geography"]
        );
    }
}
