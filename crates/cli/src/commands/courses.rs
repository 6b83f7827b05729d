//! Courses command handler.

use crate::commands::print_json;
use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_knowledge::{RagSystem, VectorStore};

/// List the stored courses
#[derive(Args, Debug)]
pub struct CoursesCommand {
    /// Include lessons for each course
    #[arg(long)]
    pub lessons: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CoursesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let rag = RagSystem::from_config(config)?;

        if self.lessons {
            let courses = rag.store().all_courses_metadata().await?;
            if self.json {
                return print_json(&courses);
            }
            for course in &courses {
                println!("{}", course.title);
                for lesson in &course.lessons {
                    println!("  Lesson {}: {}", lesson.lesson_number, lesson.title);
                }
            }
            return Ok(());
        }

        let analytics = rag.course_analytics().await?;
        if self.json {
            print_json(&analytics)?;
        } else {
            println!("{} courses", analytics.total_courses);
            for title in &analytics.course_titles {
                println!("  {}", title);
            }
        }

        Ok(())
    }
}
