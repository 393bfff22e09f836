//! Rendering a [`PersonalRecord`] into retrievable documents.
//!
//! Each logical unit of the record (the identity block, the skills block, every
//! job, project and degree) becomes its own [`Document`], so provenance
//! survives chunking and every retrieved chunk reads on its own.

use crate::document::{Category, Document, Metadata};
use crate::record::PersonalRecord;

/// Build the documents for a record.
///
/// Output order is basic info, skills, experience, projects, education,
/// certifications, interests, career goals. The last three are omitted when
/// empty. Rendered text is trimmed, so an empty last field leaves its bare
/// label.
pub fn build_documents(record: &PersonalRecord) -> Vec<Document> {
    let mut documents = Vec::with_capacity(
        5 + record.experience.len() + record.projects.len() + record.education.len(),
    );

    let basic = &record.basic;
    documents.push(rendered(
        format!(
            "Name: {}\nTitle: {}\nEmail: {}\nLocation: {}\nSummary: {}",
            basic.name, basic.title, basic.email, basic.location, basic.summary
        ),
        Metadata::new(Category::BasicInfo),
    ));

    let skills = &record.skills;
    documents.push(rendered(
        format!(
            "Programming Languages: {}\nMachine Learning Frameworks: {}\nCloud Platforms: {}\n\
             Tools: {}\nSpecialties: {}",
            skills.programming_languages.join(", "),
            skills.ml_frameworks.join(", "),
            skills.cloud_platforms.join(", "),
            skills.tools.join(", "),
            skills.specialties.join(", "),
        ),
        Metadata::new(Category::Skills),
    ));

    for (i, exp) in record.experience.iter().enumerate() {
        documents.push(rendered(
            format!(
                "Work Experience {}:\nPosition: {}\nCompany: {}\nDuration: {}\n\
                 Responsibilities: {}\nAchievements: {}",
                i + 1,
                exp.title,
                exp.company,
                exp.duration,
                exp.responsibilities.join("; "),
                exp.achievements.join("; "),
            ),
            Metadata::indexed(Category::Experience, i),
        ));
    }

    for (i, proj) in record.projects.iter().enumerate() {
        documents.push(rendered(
            format!(
                "Project Experience {}:\nProject Name: {}\nRole: {}\nDuration: {}\n\
                 Description: {}\nTechnologies: {}\nImpact: {}",
                i + 1,
                proj.name,
                proj.role,
                proj.duration,
                proj.description,
                proj.technologies.join(", "),
                proj.impact,
            ),
            Metadata::indexed(Category::Project, i),
        ));
    }

    for (i, edu) in record.education.iter().enumerate() {
        documents.push(rendered(
            format!(
                "Education {}:\nDegree: {}\nSchool: {}\nYear: {}\nFocus: {}\nGPA: {}\n\
                 Relevant Courses: {}",
                i + 1,
                edu.degree,
                edu.school,
                edu.year,
                edu.focus,
                edu.gpa,
                edu.relevant_courses.join(", "),
            ),
            Metadata::indexed(Category::Education, i),
        ));
    }

    if !record.certifications.is_empty() {
        documents.push(rendered(
            format!("Certifications: {}", record.certifications.join(", ")),
            Metadata::new(Category::Certifications),
        ));
    }

    if !record.interests.is_empty() {
        documents.push(rendered(
            format!("Interests: {}", record.interests.join(", ")),
            Metadata::new(Category::Interests),
        ));
    }

    if !record.career_goals.is_empty() {
        documents.push(rendered(
            format!("Career Goals: {}", record.career_goals),
            Metadata::new(Category::CareerGoals),
        ));
    }

    documents
}

fn rendered(text: String, metadata: Metadata) -> Document {
    Document::new(text.trim(), metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Education, Experience, Project};

    fn ada() -> PersonalRecord {
        let mut record = PersonalRecord::default();
        record.basic.name = "Ada".into();
        record.experience.push(Experience {
            title: "Engineer".into(),
            company: "Acme".into(),
            duration: "2020-2022".into(),
            responsibilities: vec!["Built X".into()],
            achievements: vec!["Shipped Y".into()],
        });
        record
    }

    #[test]
    fn single_experience_record_yields_three_documents() {
        let docs = build_documents(&ada());
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].metadata, Metadata::new(Category::BasicInfo));
        assert_eq!(docs[1].metadata, Metadata::new(Category::Skills));
        assert_eq!(docs[2].metadata, Metadata::indexed(Category::Experience, 0));
        assert_eq!(
            docs[2].text,
            "Work Experience 1:\nPosition: Engineer\nCompany: Acme\nDuration: 2020-2022\n\
             Responsibilities: Built X\nAchievements: Shipped Y"
        );
    }

    #[test]
    fn empty_skill_lists_render_as_empty_values() {
        let docs = build_documents(&PersonalRecord::default());
        assert_eq!(
            docs[1].text,
            "Programming Languages: \nMachine Learning Frameworks: \nCloud Platforms: \n\
             Tools: \nSpecialties:"
        );
    }

    #[test]
    fn basic_info_lists_all_five_fields() {
        let docs = build_documents(&ada());
        assert_eq!(
            docs[0].text,
            "Name: Ada\nTitle: Your Title\nEmail: your.email@example.com\n\
             Location: Your Location\nSummary: Your professional summary here"
        );
    }

    #[test]
    fn optional_sections_appear_in_order_when_present() {
        let mut record = ada();
        record.projects.push(Project {
            name: "Chatbot".into(),
            technologies: vec!["Rust".into(), "Axum".into()],
            ..Default::default()
        });
        record.education.push(Education {
            degree: "MSc".into(),
            relevant_courses: vec!["ML".into(), "Compilers".into()],
            ..Default::default()
        });
        record.certifications = vec!["CKA".into(), "AWS SA".into()];
        record.interests = vec!["Chess".into()];
        record.career_goals = "Lead a platform team".into();

        let docs = build_documents(&record);
        let categories: Vec<_> = docs.iter().map(|d| d.metadata.category).collect();
        assert_eq!(
            categories,
            vec![
                Category::BasicInfo,
                Category::Skills,
                Category::Experience,
                Category::Project,
                Category::Education,
                Category::Certifications,
                Category::Interests,
                Category::CareerGoals,
            ]
        );
        assert!(docs[3].text.starts_with("Project Experience 1:\nProject Name: Chatbot"));
        assert!(docs[3].text.contains("Technologies: Rust, Axum"));
        assert!(docs[4].text.ends_with("Relevant Courses: ML, Compilers"));
        assert_eq!(docs[5].text, "Certifications: CKA, AWS SA");
        assert_eq!(docs[6].text, "Interests: Chess");
        assert_eq!(docs[7].text, "Career Goals: Lead a platform team");
        assert_eq!(docs[7].id, "career_goals");
    }

    #[test]
    fn whitespace_career_goals_still_yield_a_document() {
        let mut record = ada();
        record.career_goals = "   ".into();
        let docs = build_documents(&record);
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[3].text, "Career Goals:");
        record.career_goals.clear();
        assert_eq!(build_documents(&record).len(), 3);
    }

    #[test]
    fn missing_achievements_leave_a_bare_label() {
        let mut record = ada();
        record.experience[0].achievements.clear();
        let docs = build_documents(&record);
        assert!(docs[2].text.ends_with("Responsibilities: Built X\nAchievements:"));
    }

    #[test]
    fn repeated_sections_use_one_based_labels_and_zero_based_indices() {
        let mut record = ada();
        record.experience.push(Experience { title: "Lead".into(), ..Default::default() });
        let docs = build_documents(&record);
        assert!(docs[3].text.starts_with("Work Experience 2:"));
        assert_eq!(docs[3].metadata.index, Some(1));
        assert_eq!(docs[3].id, "experience_1");
    }
}
