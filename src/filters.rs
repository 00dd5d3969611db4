use crate::forms::{
    company_options, location_options, parse_amount, parse_work_type, resolve_option, FormError,
};
use crate::models::{Company, Location, WorkType};

/// Committed search criteria. `Default` is the unfiltered search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub city_id: Option<i64>,
    pub company_id: Option<i64>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub work_type: Option<WorkType>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        *self == FilterCriteria::default()
    }

    /// Query parameters for the search and count endpoints. Unset criteria
    /// are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.city_id {
            pairs.push(("cityId", id.to_string()));
        }
        if let Some(id) = self.company_id {
            pairs.push(("companyId", id.to_string()));
        }
        if let Some(min) = self.min_salary {
            pairs.push(("minSalary", min.to_string()));
        }
        if let Some(max) = self.max_salary {
            pairs.push(("maxSalary", max.to_string()));
        }
        if let Some(work_type) = self.work_type {
            pairs.push(("workType", work_type.label().to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    City,
    Company,
    MinSalary,
    MaxSalary,
    WorkType,
}

impl FilterField {
    pub const ALL: [FilterField; 5] = [
        FilterField::City,
        FilterField::Company,
        FilterField::MinSalary,
        FilterField::MaxSalary,
        FilterField::WorkType,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FilterField::City => "Location",
            FilterField::Company => "Company",
            FilterField::MinSalary => "Min salary (K)",
            FilterField::MaxSalary => "Max salary (K)",
            FilterField::WorkType => "Work type",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterInputs {
    pub city: String,
    pub company: String,
    pub min_salary: String,
    pub max_salary: String,
    pub work_type: String,
}

impl FilterInputs {
    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::City => &self.city,
            FilterField::Company => &self.company,
            FilterField::MinSalary => &self.min_salary,
            FilterField::MaxSalary => &self.max_salary,
            FilterField::WorkType => &self.work_type,
        }
    }

    fn slot(&mut self, field: FilterField) -> &mut String {
        match field {
            FilterField::City => &mut self.city,
            FilterField::Company => &mut self.company,
            FilterField::MinSalary => &mut self.min_salary,
            FilterField::MaxSalary => &mut self.max_salary,
            FilterField::WorkType => &mut self.work_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterState {
    inputs: FilterInputs,
    committed: FilterCriteria,
}

impl FilterState {
    pub fn inputs(&self) -> &FilterInputs {
        &self.inputs
    }

    pub fn committed(&self) -> &FilterCriteria {
        &self.committed
    }

    /// Updates one uncommitted input. Returns whether the value changed.
    pub fn set_input(&mut self, field: FilterField, value: impl Into<String>) -> bool {
        let value = value.into();
        let slot = self.inputs.slot(field);
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    /// Parses the inputs and makes them the committed criteria. On error the
    /// previously committed criteria are kept.
    pub fn commit(
        &mut self,
        locations: &[Location],
        companies: &[Company],
    ) -> Result<&FilterCriteria, FormError> {
        let inputs = &self.inputs;
        let city_id = match inputs.city.trim() {
            "" => None,
            text => Some(resolve_option(&location_options(locations), text, "location")?),
        };
        let company_id = match inputs.company.trim() {
            "" => None,
            text => Some(resolve_option(&company_options(companies), text, "company")?),
        };
        let min_salary = parse_amount("Minimum salary", &inputs.min_salary)?;
        let max_salary = parse_amount("Maximum salary", &inputs.max_salary)?;
        if let (Some(min), Some(max)) = (min_salary, max_salary) {
            if min > max {
                return Err(FormError::SalaryRange);
            }
        }
        let work_type = parse_work_type(&inputs.work_type)?;

        self.committed = FilterCriteria {
            city_id,
            company_id,
            min_salary,
            max_salary,
            work_type,
        };
        Ok(&self.committed)
    }

    pub fn reset(&mut self) {
        self.inputs = FilterInputs::default();
        self.committed = FilterCriteria::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations() -> Vec<Location> {
        vec![Location {
            city_id: 7,
            city_name: "Lyon".to_string(),
            country_name: "France".to_string(),
        }]
    }

    fn companies() -> Vec<Company> {
        vec![Company {
            company_id: 3,
            company_name: "Initech".to_string(),
        }]
    }

    #[test]
    fn test_query_pairs_omit_unset_fields() {
        assert!(FilterCriteria::default().query_pairs().is_empty());

        let criteria = FilterCriteria {
            city_id: Some(7),
            min_salary: Some(50.0),
            work_type: Some(WorkType::PartTime),
            ..Default::default()
        };
        assert_eq!(
            criteria.query_pairs(),
            vec![
                ("cityId", "7".to_string()),
                ("minSalary", "50".to_string()),
                ("workType", "Part-time".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_input_reports_changes() {
        let mut state = FilterState::default();
        assert!(state.set_input(FilterField::City, "Lyon"));
        assert!(!state.set_input(FilterField::City, "Lyon"));
        assert_eq!(state.inputs().get(FilterField::City), "Lyon");
        assert!(state.committed().is_empty());
    }

    #[test]
    fn test_commit_resolves_inputs() {
        let mut state = FilterState::default();
        state.set_input(FilterField::City, "lyon");
        state.set_input(FilterField::Company, "Initech");
        state.set_input(FilterField::MinSalary, "40");
        state.set_input(FilterField::MaxSalary, "90");
        state.set_input(FilterField::WorkType, "contract");

        let committed = state.commit(&locations(), &companies()).unwrap().clone();
        assert_eq!(
            committed,
            FilterCriteria {
                city_id: Some(7),
                company_id: Some(3),
                min_salary: Some(40.0),
                max_salary: Some(90.0),
                work_type: Some(WorkType::Contract),
            }
        );
    }

    #[test]
    fn test_failed_commit_keeps_previous_criteria() {
        let mut state = FilterState::default();
        state.set_input(FilterField::MinSalary, "40");
        state.commit(&locations(), &companies()).unwrap();

        state.set_input(FilterField::MaxSalary, "10");
        assert_eq!(
            state.commit(&locations(), &companies()),
            Err(FormError::SalaryRange)
        );
        assert_eq!(state.committed().min_salary, Some(40.0));
        assert_eq!(state.committed().max_salary, None);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = FilterState::default();
        state.set_input(FilterField::City, "7");
        state.commit(&locations(), &companies()).unwrap();
        state.reset();
        assert_eq!(state.inputs(), &FilterInputs::default());
        assert!(state.committed().is_empty());
    }
}
