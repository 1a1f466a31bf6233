//! Demo catalogue for local development.

use learnmetrics_core::model::{
    ContentLevel, CourseDraft, MaterialDraft, MaterialKind, QuestionDraft, Recommendation, Role,
    UserDraft,
};
use services::{AppServices, UserServiceError};
use tracing::{debug, info};

pub struct SeedReport {
    pub users: usize,
    pub courses: usize,
}

struct CourseTemplate {
    title: &'static str,
    tags: &'static [&'static str],
    questions: &'static [(&'static str, &'static [&'static str], usize, &'static str)],
}

const JAVASCRIPT: &[(&str, &[&str], usize, &str)] = &[
    ("What is the output of 0 == false?", &["true", "false", "undefined", "null"], 0, "Types"),
    ("What is a closure?", &["A function with access to its parent scope", "A private variable", "A loop", "An object method"], 0, "Functions"),
    ("What is hoisting?", &["Lifting state", "Moving declarations to top", "A React hook", "A CSS property"], 1, "Scope"),
    ("What does Promise.all() do?", &["Runs the first promise", "Waits for all to resolve", "Runs in serial", "None"], 1, "Async"),
    ("What is the event loop?", &["A CPU feature", "Handles async callbacks", "Memory management", "DOM rendering"], 1, "Async"),
    ("What is the result of typeof null?", &["'null'", "'object'", "'undefined'", "'value'"], 1, "Types"),
];

const PYTHON: &[(&str, &[&str], usize, &str)] = &[
    ("Which keyword defines a function?", &["func", "def", "fn", "lambda"], 1, "Syntax"),
    ("What does len([1, 2, 3]) return?", &["2", "3", "4", "Error"], 1, "Collections"),
    ("Which type is immutable?", &["list", "dict", "tuple", "set"], 2, "Collections"),
    ("What does pandas.DataFrame.head() show?", &["Last rows", "First rows", "Column names", "Types"], 1, "Data Science"),
    ("What is a list comprehension?", &["A loop expression building a list", "A sort", "A class", "An import"], 0, "Syntax"),
    ("What does NumPy mainly provide?", &["Web routing", "N-dimensional arrays", "GUI widgets", "Testing"], 1, "Data Science"),
];

const SYSTEMS: &[(&str, &[&str], usize, &str)] = &[
    ("What does a load balancer do?", &["Stores files", "Distributes traffic", "Encrypts data", "Compiles code"], 1, "Scaling"),
    ("What is horizontal scaling?", &["Bigger machines", "More machines", "Faster disks", "Fewer users"], 1, "Scaling"),
    ("What does a cache reduce?", &["Latency", "Correctness", "Storage", "Security"], 0, "Caching"),
    ("What is eventual consistency?", &["Immediate agreement", "Replicas converge over time", "No replication", "Locking"], 1, "Data"),
    ("What is a write-ahead log for?", &["Durability", "Compression", "Routing", "Auth"], 0, "Data"),
    ("Which protocol is connectionless?", &["TCP", "UDP", "HTTP/1.1", "TLS"], 1, "Networking"),
];

const TEMPLATES: &[CourseTemplate] = &[
    CourseTemplate {
        title: "Full Stack Web Development Mastery",
        tags: &["JS", "React", "Node.js"],
        questions: JAVASCRIPT,
    },
    CourseTemplate {
        title: "Python for Data Science",
        tags: &["Python", "Data"],
        questions: PYTHON,
    },
    CourseTemplate {
        title: "System Design Interview Prep",
        tags: &["Architecture", "Scale"],
        questions: SYSTEMS,
    },
];

fn materials(title: &str) -> Vec<MaterialDraft> {
    let material = |kind, name: &str, url: &str, duration: &str, rating, level| MaterialDraft {
        kind: Some(kind),
        title: format!("{title} - {name}"),
        url: Some(url.to_owned()),
        duration: Some(duration.to_owned()),
        rating: Some(rating),
        level: Some(level),
    };
    vec![
        material(MaterialKind::Youtube, "Getting Started Video", "https://www.youtube.com", "12:45", 4.8, ContentLevel::Basic),
        material(MaterialKind::Website, "Official Documentation", "https://developer.mozilla.org", "Self-paced", 4.9, ContentLevel::Basic),
        material(MaterialKind::Pdf, "Cheatsheet Guide (PDF)", "https://cheatsheet.com/guide.pdf", "10 pages", 4.7, ContentLevel::Intermediate),
        material(MaterialKind::Coursera, "Foundations Course", "https://www.coursera.org", "6 weeks", 4.9, ContentLevel::Intermediate),
        material(MaterialKind::Udemy, "Complete Bootcamp", "https://www.udemy.com", "40 hours", 4.8, ContentLevel::Advanced),
    ]
}

fn recommendations(title: &str) -> Vec<Recommendation> {
    vec![
        Recommendation {
            title: format!("Advanced {title}"),
            provider: Some("Coursera".into()),
            efficiency: Some("95%".into()),
            description: Some("Take your skills further with the advanced path.".into()),
            url: Some("https://www.coursera.org".into()),
        },
        Recommendation {
            title: format!("{title} Projects"),
            provider: Some("Udemy".into()),
            efficiency: Some("82%".into()),
            description: Some("Build real-world projects.".into()),
            url: Some("https://www.udemy.com".into()),
        },
    ]
}

fn course_draft(template: &CourseTemplate) -> CourseDraft {
    let questions: Vec<QuestionDraft> = template
        .questions
        .iter()
        .map(|&(question, options, correct_answer, topic)| QuestionDraft {
            question: question.to_owned(),
            options: options.iter().map(|&o| o.to_owned()).collect(),
            correct_answer,
            difficulty: None,
            topic: Some(topic.to_owned()),
        })
        .collect();
    let (pre, post) = questions.split_at(questions.len() / 2);

    CourseDraft {
        title: template.title.to_owned(),
        description: Some(format!("A guided path through {}.", template.title)),
        tags: template.tags.iter().map(|&t| t.to_owned()).collect(),
        duration: Some("8 weeks".into()),
        materials: materials(template.title),
        pre_test_questions: pre.to_vec(),
        post_test_questions: post.to_vec(),
        recommendations: recommendations(template.title),
    }
}

/// Insert demo users and courses. Existing users are kept; existing courses
/// are left alone unless `reset` is set.
pub async fn run(services: &AppServices, reset: bool) -> anyhow::Result<SeedReport> {
    let mut users = 0;
    for (full_name, email, role) in [
        ("Admin", "admin@learnmetrics.local", Role::Admin),
        ("Demo Learner", "learner@learnmetrics.local", Role::Learner),
    ] {
        let draft = UserDraft {
            full_name: full_name.into(),
            email: email.into(),
            role,
        };
        match services.users().register(draft).await {
            Ok(_) => users += 1,
            Err(UserServiceError::DuplicateEmail) => debug!(email, "user already present"),
            Err(e) => return Err(e.into()),
        }
    }

    let course_service = services.courses();
    let existing = course_service.list_courses().await?;
    if !existing.is_empty() {
        if !reset {
            info!(count = existing.len(), "courses already present, skipping");
            return Ok(SeedReport { users, courses: 0 });
        }
        for course in &existing {
            course_service.delete_course(course.id()).await?;
        }
    }

    for template in TEMPLATES {
        course_service.create_course(course_draft(template)).await?;
    }

    Ok(SeedReport {
        users,
        courses: TEMPLATES.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnmetrics_core::placement::PlacementPolicy;
    use learnmetrics_core::time::fixed_clock;

    #[tokio::test]
    async fn seeding_is_idempotent_without_reset() {
        let services = AppServices::in_memory(fixed_clock(), PlacementPolicy::default());

        let first = run(&services, false).await.unwrap();
        assert_eq!((first.users, first.courses), (2, 3));

        let second = run(&services, false).await.unwrap();
        assert_eq!((second.users, second.courses), (0, 0));

        let third = run(&services, true).await.unwrap();
        assert_eq!(third.courses, 3);
        assert_eq!(services.courses().list_courses().await.unwrap().len(), 3);
    }

    #[test]
    fn demo_courses_validate_and_split_banks() {
        for template in TEMPLATES {
            let course = course_draft(template).validate().unwrap();
            assert_eq!(course.pre_test_questions.len(), 3);
            assert_eq!(course.post_test_questions.len(), 3);
            assert!(
                course
                    .materials
                    .iter()
                    .any(|m| m.level == Some(ContentLevel::Advanced))
            );
        }
    }
}
